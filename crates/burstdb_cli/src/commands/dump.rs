//! Dump command implementation.

use super::open_repository;
use burstdb_codec::{FrameKind, FrameReader, OperationEnvelope, TransactionEnvelope};
use burstdb_core::repository::naming::parse_name;
use burstdb_core::StoreRepository;
use serde::Serialize;
use std::path::Path;

/// Frame representation for output.
#[derive(Debug, Serialize)]
pub struct FrameInfo {
    /// Position of the frame in the file.
    pub index: u64,
    /// Frame kind.
    pub frame_kind: String,
    /// Transaction id (bursts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Operation kind.
    pub operation: String,
    /// Encoded operation size in bytes.
    pub body_size: usize,
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    name: &str,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if parse_name(name).is_none() {
        return Err(format!("{name} is not a burst or snapshot name").into());
    }

    let repository = open_repository(path)?;
    let frames = read_frames(&repository, name, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&frames)?);
        }
        _ => {
            print_text_output(name, &frames);
        }
    }

    Ok(())
}

/// Decodes up to `limit` frames of one blob.
pub fn read_frames(
    repository: &StoreRepository<()>,
    name: &str,
    limit: Option<usize>,
) -> Result<Vec<FrameInfo>, Box<dyn std::error::Error>> {
    let mut reader = FrameReader::new(repository.store().open_read(name)?);
    let max_frames = limit.unwrap_or(usize::MAX);
    let mut frames = Vec::new();

    while frames.len() < max_frames {
        let index = reader.frames_read();
        let Some(frame) = reader.next_frame()? else {
            break;
        };
        let info = match frame.kind {
            FrameKind::Transaction => {
                let envelope = TransactionEnvelope::decode(&frame.payload)?;
                FrameInfo {
                    index,
                    frame_kind: "transaction".to_string(),
                    id: Some(envelope.id),
                    operation: envelope.kind,
                    body_size: envelope.body.len(),
                }
            }
            FrameKind::Operation => {
                let envelope = OperationEnvelope::decode(&frame.payload)?;
                FrameInfo {
                    index,
                    frame_kind: "operation".to_string(),
                    id: None,
                    operation: envelope.kind,
                    body_size: envelope.body.len(),
                }
            }
        };
        frames.push(info);
    }

    Ok(frames)
}

fn print_text_output(name: &str, frames: &[FrameInfo]) {
    println!("{name}: {} frames", frames.len());
    for frame in frames {
        match frame.id {
            Some(id) => println!(
                "  #{:<4} {:<12} id={:<8} {} ({} bytes)",
                frame.index, frame.frame_kind, id, frame.operation, frame.body_size
            ),
            None => println!(
                "  #{:<4} {:<12} {} ({} bytes)",
                frame.index, frame.frame_kind, frame.operation, frame.body_size
            ),
        }
    }
}
