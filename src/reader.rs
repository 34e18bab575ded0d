//! Process-memory reader (§4.7): one handle per worker onto a target
//! process's raw memory, read positionally so concurrent workers never race
//! on a shared file offset.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;

use nix::sys::ptrace;
use nix::unistd::Pid;

use crate::error::ScanError;

/// An open handle to a target process's `/proc/<pid>/mem`.
pub struct ProcessMemoryReader {
    pid: i32,
    file: File,
}

impl ProcessMemoryReader {
    /// Opens a read-only handle to `pid`'s memory. Does not attach via
    /// ptrace — callers that need to read a non-child process should pair
    /// this with an [`AttachGuard`] held for the scan pass's duration.
    pub fn open(pid: i32) -> Result<Self, ScanError> {
        let path = format!("/proc/{pid}/mem");
        let file = OpenOptions::new().read(true).open(&path).map_err(|source| {
            match source.kind() {
                std::io::ErrorKind::NotFound => ScanError::NoSuchProcess { pid },
                std::io::ErrorKind::PermissionDenied => {
                    ScanError::PermissionDenied { pid, source }
                }
                _ => ScanError::RegionReadError {
                    start: 0,
                    end: 0,
                    source,
                },
            }
        })?;
        Ok(ProcessMemoryReader { pid, file })
    }

    /// The pid this handle reads from.
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Reads up to `buf.len()` bytes starting at `addr` in the target's
    /// address space. Returns the number of bytes actually read, which may
    /// be less than `buf.len()` at the tail of a mapping.
    pub fn read_at(&self, addr: u64, buf: &mut [u8]) -> Result<usize, ScanError> {
        self.file.read_at(buf, addr).map_err(|source| ScanError::RegionReadError {
            start: addr,
            end: addr + buf.len() as u64,
            source,
        })
    }

    /// Reads exactly `buf.len()` bytes, failing if the mapping is shorter
    /// than requested at this offset.
    pub fn read_exact_at(&self, addr: u64, buf: &mut [u8]) -> Result<(), ScanError> {
        let n = self.read_at(addr, buf)?;
        if n != buf.len() {
            return Err(ScanError::RegionReadError {
                start: addr,
                end: addr + buf.len() as u64,
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("short read: got {n} of {} bytes", buf.len()),
                ),
            });
        }
        Ok(())
    }
}

/// Brackets a scan pass with `PTRACE_ATTACH`/`PTRACE_DETACH` so that
/// `/proc/<pid>/mem` reads are permitted against a non-child target under
/// the kernel's ptrace-scope policy. Detach always runs on drop, even on an
/// early return, mirroring deterministic reader teardown (§5).
pub struct AttachGuard {
    pid: Pid,
    attached: bool,
}

impl AttachGuard {
    /// Attaches to `pid` and waits for it to stop. Errors if the process
    /// does not exist or this process lacks ptrace privilege over it.
    pub fn attach(pid: i32) -> Result<Self, ScanError> {
        let target = Pid::from_raw(pid);
        ptrace::attach(target).map_err(|errno| match errno {
            nix::errno::Errno::ESRCH => ScanError::NoSuchProcess { pid },
            nix::errno::Errno::EPERM => ScanError::PermissionDenied {
                pid,
                source: std::io::Error::from(errno),
            },
            other => ScanError::PermissionDenied {
                pid,
                source: std::io::Error::from(other),
            },
        })?;
        match nix::sys::wait::waitpid(target, None) {
            Ok(_) => {}
            Err(_) => {
                let _ = ptrace::detach(target, None);
                return Err(ScanError::NoSuchProcess { pid });
            }
        }
        Ok(AttachGuard { pid: target, attached: true })
    }
}

impl Drop for AttachGuard {
    fn drop(&mut self) {
        if self.attached {
            let _ = ptrace::detach(self.pid, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_nonexistent_pid_reports_no_such_process() {
        // pid_max on any real Linux host is far below this value.
        let result = ProcessMemoryReader::open(i32::MAX - 1);
        assert!(matches!(result, Err(ScanError::NoSuchProcess { .. })));
    }

    #[test]
    fn open_self_succeeds_and_reads_readable_bytes() {
        let pid = std::process::id() as i32;
        let reader = ProcessMemoryReader::open(pid).expect("should open own memory");
        assert_eq!(reader.pid(), pid);
        // Reading from a near-certainly-unmapped low address should fail
        // cleanly rather than panic.
        let mut buf = [0u8; 8];
        let _ = reader.read_at(0x10, &mut buf);
    }
}
