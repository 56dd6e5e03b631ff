//! Output formatting for reports and errors

use anyhow::Error;
use colored::*;
use irqlat_engine::MeasurementReport;
use serde_json::json;
use std::io::{self, Write};

/// Print the measurement report to stdout
pub fn print_report(report: &MeasurementReport, json: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        report.write_json(&mut out)?;
    } else {
        report.write_text(&mut out)?;
    }
    out.flush()
}

/// Messages of an error and each of its causes, outermost first
pub fn error_chain(error: &Error) -> Vec<String> {
    error.chain().map(ToString::to_string).collect()
}

/// Print error in JSON format
pub fn print_error_json(error: &Error, exit_code: i32) {
    let mut chain = error_chain(error).into_iter();
    let error_json = json!({
        "success": false,
        "error": {
            "message": chain.next().unwrap_or_default(),
            "chain": chain.collect::<Vec<_>>(),
            "exit_code": exit_code,
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    let mut chain = error_chain(error).into_iter();
    if let Some(message) = chain.next() {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    for cause in chain {
        eprintln!("  {} {}", "Caused by:".yellow(), cause);
    }
}
