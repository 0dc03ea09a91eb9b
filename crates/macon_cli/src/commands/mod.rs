//! CLI command implementations.

pub mod backup;
pub mod pull;
pub mod push;
pub mod sync;

use crate::error::{CliError, CliResult};
use macon_sync_engine::{DomainTable, FieldTransfer, TransferSummary};

/// Prints one line per field of every transferred group.
///
/// `arrow` shows the direction: `→` towards the device, `←` towards the
/// database.
fn print_progress(arrow: &str, domains: &DomainTable, summary: &TransferSummary) {
    for report in &summary.reports {
        let settings = domains.get(report.group);
        for (variable, outcome) in &report.fields {
            let symbol = settings.symbol(variable);
            match outcome {
                FieldTransfer::Transferred(value) => println!("{arrow} {symbol} = {value}"),
                FieldTransfer::Missing => println!("  {symbol} skipped, not in document"),
                FieldTransfer::Failed(e) => println!("⚠ {symbol} failed: {e}"),
            }
        }
    }
    for (group, e) in &summary.failures {
        println!("⚠ {group} skipped: {e}");
    }
}

/// Fails if a whole group was skipped.
pub fn ensure_complete(operation: &'static str, summary: &TransferSummary) -> CliResult<()> {
    if summary.is_complete() {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            operation,
            groups: summary.failures.len(),
        })
    }
}
