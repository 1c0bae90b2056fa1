//! Inspect command implementation.

use super::open_repository;
use burstdb_core::{Catalog, OperationId};
use serde::Serialize;
use std::path::Path;

/// Repository inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Database path.
    pub path: String,
    /// Bursts in replay order.
    pub bursts: Vec<BurstInfo>,
    /// Snapshots, newest first.
    pub snapshots: Vec<SnapshotInfo>,
    /// Id of the snapshot recovery would start from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_snapshot: Option<u64>,
    /// Highest id reachable from the best snapshot without a gap.
    pub reachable_through: u64,
    /// Files that are neither bursts nor snapshots.
    pub ignored: Vec<String>,
}

/// A burst as listed by name.
#[derive(Debug, Serialize)]
pub struct BurstInfo {
    /// File name.
    pub name: String,
    /// First id.
    pub first: u64,
    /// Last id.
    pub last: u64,
}

/// A snapshot as listed by name.
#[derive(Debug, Serialize)]
pub struct SnapshotInfo {
    /// File name.
    pub name: String,
    /// Id of the last operation it covers.
    pub id: u64,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(path)?;
    let result = inspect(path, &repository.catalog()?);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Summarizes a catalog.
pub fn inspect(path: &Path, catalog: &Catalog) -> InspectResult {
    let best = catalog.snapshots.first().map(|s| s.id);
    let reachable = catalog.reachable_from(best.unwrap_or(OperationId::ZERO));

    InspectResult {
        path: path.display().to_string(),
        bursts: catalog
            .bursts
            .iter()
            .map(|b| BurstInfo {
                name: b.name.clone(),
                first: b.range.first.as_u64(),
                last: b.range.last.as_u64(),
            })
            .collect(),
        snapshots: catalog
            .snapshots
            .iter()
            .map(|s| SnapshotInfo {
                name: s.name.clone(),
                id: s.id.as_u64(),
            })
            .collect(),
        best_snapshot: best.map(OperationId::as_u64),
        reachable_through: reachable.as_u64(),
        ignored: catalog.ignored.clone(),
    }
}

fn print_text_output(result: &InspectResult) {
    println!("BurstDB Repository Inspection");
    println!("=============================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Bursts ({}):", result.bursts.len());
    for burst in &result.bursts {
        println!("  [{}, {}]  {}", burst.first, burst.last, burst.name);
    }
    println!();
    println!("Snapshots ({}):", result.snapshots.len());
    for snapshot in &result.snapshots {
        println!("  {}  {}", snapshot.id, snapshot.name);
    }
    println!();
    println!("Recovery:");
    match result.best_snapshot {
        Some(id) => println!("  Best snapshot:     {id}"),
        None => println!("  Best snapshot:     none"),
    }
    println!("  Reachable through: {}", result.reachable_through);

    if !result.ignored.is_empty() {
        println!();
        println!("Ignored ({}):", result.ignored.len());
        for name in &result.ignored {
            println!("  {name}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_util::{write_burst, write_snapshot};
    use tempfile::tempdir;

    #[test]
    fn reports_reachable_range_from_best_snapshot() {
        let dir = tempdir().unwrap();
        write_snapshot(dir.path(), "snapshot-2.bdb", 1);
        write_burst(dir.path(), "burst-1-3.bdb", &[1, 2, 3]);
        write_burst(dir.path(), "burst-4-5.bdb", &[4, 5]);
        write_burst(dir.path(), "burst-8-9.bdb", &[8, 9]);
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();

        let repository = open_repository(dir.path()).unwrap();
        let result = inspect(dir.path(), &repository.catalog().unwrap());

        assert_eq!(result.bursts.len(), 3);
        assert_eq!(result.bursts[0].name, "burst-1-3.bdb");
        assert_eq!(result.best_snapshot, Some(2));
        assert_eq!(result.reachable_through, 5);
        assert_eq!(result.ignored, vec!["notes.txt".to_string()]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(open_repository(&dir.path().join("nope")).is_err());
    }
}
