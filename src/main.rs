//! Binary entry point for the `vmscan` command-line tool.
//!
//! Parses a pid and a scan-option/value literal, runs exactly one scan pass
//! through a fresh [`ScannerSession`], and prints the resulting match count
//! and statistics. This is deliberately not the interactive REPL — it binds
//! one session, runs one pass, and exits.

use anyhow::Context;
use clap::Parser;

use vmscan::cli::args::Args;
use vmscan::cli::literal::parse_literal;
use vmscan::engine::ScanOptions;
use vmscan::session::ScannerSession;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let data_type = args.data_type.into();
    let user_value = parse_literal(data_type, &args.value)
        .with_context(|| format!("parsing value literal {:?}", args.value))?;

    let options = ScanOptions {
        data_type,
        match_type: args.match_type.into(),
        step: args.step.max(1),
        region_level: args.region_level.into(),
        reverse_endianness: args.reverse_endianness,
        ..ScanOptions::default()
    };

    let mut session = ScannerSession::new(args.pid);
    let report = session
        .perform_scan(&options, &user_value)
        .with_context(|| format!("scanning pid {}", args.pid))?;

    println!(
        "matches: {}  (regions visited: {}, bytes scanned: {})",
        report.match_count, report.stats.regions_visited, report.stats.bytes_scanned
    );
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    Ok(())
}
