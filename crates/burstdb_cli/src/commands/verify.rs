//! Verify command implementation.

use super::open_repository;
use burstdb_codec::{FrameKind, FrameReader, OperationEnvelope, TransactionEnvelope};
use burstdb_core::{BurstEntry, OperationId, SnapshotEntry, StoreRepository};
use std::path::Path;

/// Verification result for one file.
#[derive(Debug)]
pub struct VerifyResult {
    /// File name.
    pub name: String,
    /// Number of frames that decoded cleanly.
    pub frames: usize,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frames: 0,
            errors: Vec::new(),
        }
    }

    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying repository at {:?}", path);
    println!();

    let repository = open_repository(path)?;
    let results = verify(&repository)?;
    for result in &results {
        print_result(result);
    }

    println!();
    if results.iter().all(VerifyResult::is_ok) {
        println!("✓ Repository verification passed ({} files)", results.len());
        Ok(())
    } else {
        println!("✗ Repository verification failed");
        Err("Verification failed".into())
    }
}

/// Checks every burst and snapshot of a repository.
pub fn verify(repository: &StoreRepository<()>) -> Result<Vec<VerifyResult>, Box<dyn std::error::Error>> {
    let catalog = repository.catalog()?;
    let mut results = Vec::with_capacity(catalog.bursts.len() + catalog.snapshots.len());
    for burst in &catalog.bursts {
        results.push(verify_burst(repository, burst));
    }
    for snapshot in &catalog.snapshots {
        results.push(verify_snapshot(repository, snapshot));
    }
    Ok(results)
}

fn verify_burst(repository: &StoreRepository<()>, entry: &BurstEntry) -> VerifyResult {
    let mut result = VerifyResult::new(&entry.name);
    let blob = match repository.store().open_read(&entry.name) {
        Ok(blob) => blob,
        Err(e) => {
            result.errors.push(format!("Failed to open: {e}"));
            return result;
        }
    };

    let mut frames = FrameReader::new(blob);
    let mut previous: Option<u64> = None;
    loop {
        let frame = match frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                result
                    .errors
                    .push(format!("Frame {}: {e}", frames.frames_read()));
                break;
            }
        };
        if frame.kind != FrameKind::Transaction {
            result.errors.push(format!(
                "Frame {}: expected a transaction, found {:?}",
                result.frames, frame.kind
            ));
            break;
        }
        let envelope = match TransactionEnvelope::decode(&frame.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                result.errors.push(format!("Frame {}: {e}", result.frames));
                break;
            }
        };

        let id = envelope.id;
        if previous.is_none() && id != entry.range.first.as_u64() {
            result.errors.push(format!(
                "First id {id} does not match name (expected {})",
                entry.range.first
            ));
        }
        if let Some(prev) = previous {
            if id <= prev {
                result
                    .errors
                    .push(format!("Id {id} does not follow {prev}"));
            }
        }
        if !entry.range.contains(OperationId::new(id)) {
            result
                .errors
                .push(format!("Id {id} outside {}", entry.range));
        }
        previous = Some(id);
        result.frames += 1;
    }

    match previous {
        None if result.errors.is_empty() => result.errors.push("Burst is empty".to_string()),
        Some(last) if last != entry.range.last.as_u64() => result.errors.push(format!(
            "Last id {last} does not match name (expected {})",
            entry.range.last
        )),
        _ => {}
    }
    result
}

fn verify_snapshot(repository: &StoreRepository<()>, entry: &SnapshotEntry) -> VerifyResult {
    let mut result = VerifyResult::new(&entry.name);
    let blob = match repository.store().open_read(&entry.name) {
        Ok(blob) => blob,
        Err(e) => {
            result.errors.push(format!("Failed to open: {e}"));
            return result;
        }
    };

    let mut frames = FrameReader::new(blob);
    loop {
        let frame = match frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                result
                    .errors
                    .push(format!("Frame {}: {e}", frames.frames_read()));
                break;
            }
        };
        if frame.kind != FrameKind::Operation {
            result.errors.push(format!(
                "Frame {}: expected an operation, found {:?}",
                result.frames, frame.kind
            ));
            break;
        }
        match OperationEnvelope::decode(&frame.payload) {
            Ok(envelope) if envelope.kind.is_empty() => {
                result
                    .errors
                    .push(format!("Frame {}: nil operation", result.frames));
                break;
            }
            Ok(_) => result.frames += 1,
            Err(e) => {
                result.errors.push(format!("Frame {}: {e}", result.frames));
                break;
            }
        }
    }
    result
}

fn print_result(result: &VerifyResult) {
    if result.is_ok() {
        println!("  ✓ {} ({} frames)", result.name, result.frames);
    } else {
        println!("  ✗ {} ({} frames)", result.name, result.frames);
        for error in &result.errors {
            println!("      {error}");
        }
    }
}
