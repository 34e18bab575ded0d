//! End-to-end scan over this test binary's own process: plants a marked
//! value on the heap, drives it through a real `ScannerSession`, and checks
//! that the match set both finds the planted address and narrows correctly
//! across a refine pass.

use vmscan::engine::ScanOptions;
use vmscan::{DataType, MatchType, RegionLevel, ScannerSession, UserValue};

const MARKER: i32 = 0x1a2b_3c4d;

fn heap_scan_options(data_type: DataType, match_type: MatchType) -> ScanOptions {
    ScanOptions {
        data_type,
        match_type,
        region_level: RegionLevel::HeapStackOnly,
        ..ScanOptions::default()
    }
}

#[test]
fn finds_a_planted_i32_value_on_the_heap() {
    let planted: &'static mut i32 = Box::leak(Box::new(MARKER));
    let addr = planted as *const i32 as u64;

    let pid = std::process::id() as i32;
    let options = heap_scan_options(DataType::I32, MatchType::Equal);
    let user_value = UserValue::from_scalar(MARKER);

    let mut session = ScannerSession::new(pid);
    let report = session
        .perform_scan(&options, &user_value)
        .expect("scanning our own process should succeed");

    assert!(report.match_count > 0, "expected at least one match for the planted marker");
    assert!(
        session.matches().iter_live().any(|(a, _, _)| a == addr),
        "expected planted address {addr:#x} among the matches"
    );
}

#[test]
fn refine_pass_narrows_down_to_a_changed_value() {
    let planted: &'static mut i32 = Box::leak(Box::new(999_000_111));
    let addr = planted as *const i32 as u64;
    let pid = std::process::id() as i32;

    let mut session = ScannerSession::new(pid);
    let first_options = heap_scan_options(DataType::I32, MatchType::Equal);
    let first = session
        .perform_scan(&first_options, &UserValue::from_scalar(999_000_111i32))
        .unwrap();
    assert!(first.match_count > 0);
    assert!(session.matches().iter_live().any(|(a, _, _)| a == addr));

    *planted += 1;

    let refine_options = heap_scan_options(DataType::I32, MatchType::Increased);
    let refined = session
        .perform_scan(&refine_options, &UserValue::from_scalar(0i32))
        .unwrap();

    assert!(refined.match_count > 0, "expected the incremented marker to still match");
    assert!(
        session.matches().iter_live().any(|(a, _, _)| a == addr),
        "planted address should survive an Increased refine pass"
    );
}

#[test]
fn clearing_matches_forces_the_next_pass_to_be_a_first_scan() {
    let _planted: &'static mut i32 = Box::leak(Box::new(0x7eed_beef));
    let pid = std::process::id() as i32;
    let mut session = ScannerSession::new(pid);
    let options = heap_scan_options(DataType::I32, MatchType::Equal);
    session
        .perform_scan(&options, &UserValue::from_scalar(0x7eed_beefi32))
        .unwrap();
    assert!(session.has_matches());

    session.clear_matches();
    assert!(!session.has_matches());
    assert!(session.last_stats().is_none());
}

#[test]
fn scanning_a_nonexistent_pid_reports_no_such_process() {
    let mut session = ScannerSession::new(i32::MAX - 1);
    let options = heap_scan_options(DataType::I32, MatchType::Equal);
    let err = session
        .perform_scan(&options, &UserValue::from_scalar(1i32))
        .unwrap_err();
    assert!(matches!(err, vmscan::ScanError::NoSuchProcess { .. }));
}
