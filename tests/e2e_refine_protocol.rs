//! Exercises the refine pass's handling of a mapping that disappears between
//! scans: an anonymous page is mapped in this test binary's own address
//! space, planted with a marker, found by a first scan, then unmapped before
//! the refine pass runs.

use vmscan::concurrency::stop_channel;
use vmscan::engine::{refine_scan, ScanOptions};
use vmscan::{DataType, MatchType, RegionLevel, UserValue, Warning};

const PAGE_SIZE: usize = 4096;
const MARKER: u32 = 0xcafef00d;

fn options() -> ScanOptions {
    ScanOptions {
        data_type: DataType::U32,
        match_type: MatchType::Equal,
        region_level: RegionLevel::Writable,
        ..ScanOptions::default()
    }
}

#[test]
fn refine_pass_drops_and_warns_on_a_match_whose_mapping_was_removed() {
    let pid = std::process::id() as i32;

    let map = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            PAGE_SIZE,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    assert_ne!(map, libc::MAP_FAILED, "mmap of a fresh anonymous page should succeed");

    unsafe {
        (map as *mut u32).write(MARKER);
    }

    let uv = UserValue::from_scalar(MARKER);
    let (_tx, stop) = stop_channel();
    let first = vmscan::engine::first_scan(pid, &options(), &uv, &stop).expect("first scan should succeed");
    let addr = map as u64;
    assert!(
        first.matches.iter_live().any(|(a, _, _)| a == addr),
        "expected the freshly mapped marker at {addr:#x} among the first-scan matches"
    );

    let unmap_result = unsafe { libc::munmap(map, PAGE_SIZE) };
    assert_eq!(unmap_result, 0, "munmap should succeed");

    let refined = refine_scan(pid, &options(), &uv, &first.matches, &stop).expect("refine scan should succeed");

    assert!(
        !refined.matches.iter_live().any(|(a, _, _)| a == addr),
        "a match whose backing mapping disappeared must not survive the refine pass"
    );
    assert!(
        refined
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::RegionUnmapped { address } if *address == addr)),
        "expected a RegionUnmapped warning for the address whose mapping vanished"
    );
}

#[test]
fn refine_pass_keeps_a_match_whose_value_still_satisfies_the_predicate() {
    let pid = std::process::id() as i32;
    let planted: &'static mut u32 = Box::leak(Box::new(MARKER));
    let addr = planted as *const u32 as u64;

    let mut heap_options = options();
    heap_options.region_level = RegionLevel::HeapStackOnly;
    let uv = UserValue::from_scalar(MARKER);
    let (_tx, stop) = stop_channel();

    let first = vmscan::engine::first_scan(pid, &heap_options, &uv, &stop).unwrap();
    assert!(first.matches.iter_live().any(|(a, _, _)| a == addr));

    let refined = refine_scan(pid, &heap_options, &uv, &first.matches, &stop).unwrap();
    assert!(
        refined.matches.iter_live().any(|(a, _, _)| a == addr),
        "an unchanged value should still satisfy Equal on the refine pass"
    );
}

#[test]
fn a_third_refine_pass_still_sees_a_correctly_reconstructed_multi_byte_old_value() {
    // I32 so a match spans four bytes and has three dead neighbors per §4.9.
    // Each refine pass must rewrite all four `ByteRecord`s (not just the
    // first), or the *next* pass's assembled old value is missing its upper
    // bytes. 1005 (0x03ED) has a nonzero second byte, so a dropped dead
    // neighbor changes the decoded old value rather than leaving it
    // coincidentally correct.
    let pid = std::process::id() as i32;
    let planted: &'static mut i32 = Box::leak(Box::new(1_000));
    let addr = planted as *const i32 as u64;

    let mut opts = ScanOptions {
        data_type: DataType::I32,
        match_type: MatchType::Equal,
        region_level: RegionLevel::HeapStackOnly,
        ..ScanOptions::default()
    };
    let (_tx, stop) = stop_channel();

    let first =
        vmscan::engine::first_scan(pid, &opts, &UserValue::from_scalar(1_000i32), &stop).unwrap();
    assert!(first.matches.iter_live().any(|(a, _, _)| a == addr));

    *planted = 1_005;
    opts.match_type = MatchType::IncreasedBy;
    let second =
        refine_scan(pid, &opts, &UserValue::from_scalar(5i32), &first.matches, &stop).unwrap();
    assert!(
        second.matches.iter_live().any(|(a, _, _)| a == addr),
        "1000 -> 1005 should satisfy IncreasedBy(5) on the second pass"
    );

    *planted = 1_010;
    let third =
        refine_scan(pid, &opts, &UserValue::from_scalar(5i32), &second.matches, &stop).unwrap();
    assert!(
        third.matches.iter_live().any(|(a, _, _)| a == addr),
        "1005 -> 1010 should satisfy IncreasedBy(5) on the third pass, which depends on the \
         second pass having reconstructed every dead-neighbor byte of the old value 1005"
    );
}
