//! Prune command implementation.

use super::open_repository;
use burstdb_core::{OperationId, PruneReport};
use std::path::Path;
use tracing::info;

/// Runs the prune command.
pub fn run(path: &Path, through: u64, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(path)?;
    let through = OperationId::new(through);

    let report = if dry_run {
        println!("Dry run - no files will be removed");
        repository.plan_prune(through)?
    } else {
        info!(path = %path.display(), %through, "pruning repository");
        repository.prune(through)?
    };

    print_report(&report, dry_run);
    Ok(())
}

fn print_report(report: &PruneReport, dry_run: bool) {
    let Some(kept) = report.kept_snapshot else {
        println!("No snapshot at or below the requested id; nothing to prune");
        return;
    };

    let verb = if dry_run { "Would remove" } else { "Removed" };
    println!("Anchored on snapshot {kept}");
    println!(
        "{verb} {} bursts and {} snapshots",
        report.bursts.len(),
        report.snapshots.len()
    );
    for name in report.bursts.iter().chain(&report.snapshots) {
        println!("  {name}");
    }
}
