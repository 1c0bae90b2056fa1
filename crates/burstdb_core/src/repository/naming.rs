//! Blob naming for bursts and snapshots.
//!
//! ```text
//! burst-{first}-{last}.bdb        snapshot-{id}.bdb
//! burst-{first}-{last}.{n}.bdb    snapshot-{id}.{n}.bdb
//! ```
//!
//! The `.{n}` discriminator is inserted when the plain name is already
//! taken, e.g. by a burst with an identical range. Bursts moved out of the
//! replayable history keep their name behind [`STRANDED_PREFIX`], which no
//! longer parses.

use crate::types::{BurstRange, OperationId};

/// File extension of published blobs.
pub const EXTENSION: &str = "bdb";

/// Prefix of staged, unpublished burst blobs.
pub const TMP_BURST_PREFIX: &str = "tmp-burst-";

/// Prefix of staged, unpublished snapshot blobs.
pub const TMP_SNAPSHOT_PREFIX: &str = "tmp-snapshot-";

/// Prefix of bursts set aside because they lie past a gap in the history.
pub const STRANDED_PREFIX: &str = "stranded-";

const BURST_PREFIX: &str = "burst-";
const SNAPSHOT_PREFIX: &str = "snapshot-";

/// What a published blob name identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobName {
    /// A burst covering the given range.
    Burst(BurstRange),
    /// A snapshot with the given id.
    Snapshot(OperationId),
}

/// Returns the name of a burst blob. `discriminator` 0 yields the plain name.
#[must_use]
pub fn burst_name(range: BurstRange, discriminator: u32) -> String {
    with_discriminator(
        format!("{BURST_PREFIX}{}-{}", range.first.0, range.last.0),
        discriminator,
    )
}

/// Returns the name of a snapshot blob. `discriminator` 0 yields the plain name.
#[must_use]
pub fn snapshot_name(id: OperationId, discriminator: u32) -> String {
    with_discriminator(format!("{SNAPSHOT_PREFIX}{}", id.0), discriminator)
}

/// Returns the name a set-aside burst is kept under.
#[must_use]
pub fn stranded_name(name: &str, discriminator: u32) -> String {
    if discriminator == 0 {
        format!("{STRANDED_PREFIX}{name}")
    } else {
        format!("{STRANDED_PREFIX}{discriminator}-{name}")
    }
}

/// Sort key that orders discriminated names numerically: `x.bdb`, then
/// `x.2.bdb`, then `x.10.bdb`.
#[must_use]
pub fn sort_key(name: &str) -> (&str, u32) {
    let Some(stem) = name
        .strip_suffix(EXTENSION)
        .and_then(|stem| stem.strip_suffix('.'))
    else {
        return (name, 0);
    };
    match stem.rsplit_once('.') {
        Some((base, n)) => match parse_number(n).and_then(|n| u32::try_from(n).ok()) {
            Some(n) => (base, n),
            None => (stem, 0),
        },
        None => (stem, 0),
    }
}

fn with_discriminator(stem: String, discriminator: u32) -> String {
    if discriminator == 0 {
        format!("{stem}.{EXTENSION}")
    } else {
        format!("{stem}.{discriminator}.{EXTENSION}")
    }
}

/// Parses a published blob name.
///
/// Returns `None` for anything that is not a well-formed burst or snapshot
/// name, including staged blobs and bursts with `first == 0` or
/// `first > last`.
#[must_use]
pub fn parse_name(name: &str) -> Option<BlobName> {
    let stem = name.strip_suffix(EXTENSION)?.strip_suffix('.')?;
    let stem = match stem.rsplit_once('.') {
        Some((base, discriminator)) => {
            parse_number(discriminator).filter(|n| *n > 0)?;
            base
        }
        None => stem,
    };

    if let Some(range) = stem.strip_prefix(BURST_PREFIX) {
        let (first, last) = range.split_once('-')?;
        let (first, last) = (parse_number(first)?, parse_number(last)?);
        if first == 0 || first > last {
            return None;
        }
        return Some(BlobName::Burst(BurstRange::new(first, last)));
    }

    let id = parse_number(stem.strip_prefix(SNAPSHOT_PREFIX)?)?;
    Some(BlobName::Snapshot(OperationId::new(id)))
}

fn parse_number(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
