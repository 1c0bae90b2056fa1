//! Core type definitions for BurstDB.

use std::fmt;

/// Position of an operation in the authoritative history.
///
/// Ids are strictly increasing and never reused. [`OperationId::ZERO`] means
/// "nothing applied yet" and is never assigned to an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(pub u64);

impl OperationId {
    /// The id before the first operation.
    pub const ZERO: Self = Self(0);

    /// Creates a new operation id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the id that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns true for [`OperationId::ZERO`].
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op:{}", self.0)
    }
}

impl From<u64> for OperationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Inclusive range of operation ids covered by a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BurstRange {
    /// First id in the burst.
    pub first: OperationId,
    /// Last id in the burst.
    pub last: OperationId,
}

impl BurstRange {
    /// Creates a range from raw ids.
    #[must_use]
    pub const fn new(first: u64, last: u64) -> Self {
        Self {
            first: OperationId(first),
            last: OperationId(last),
        }
    }

    /// Returns true if `id` lies within the range.
    #[must_use]
    pub fn contains(&self, id: OperationId) -> bool {
        self.first <= id && id <= self.last
    }
}

impl fmt::Display for BurstRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.first.0, self.last.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_id_ordering() {
        let a = OperationId::new(1);
        let b = OperationId::new(2);
        assert!(a < b);
        assert!(OperationId::ZERO < a);
    }

    #[test]
    fn operation_id_next() {
        assert_eq!(OperationId::ZERO.next(), OperationId::new(1));
        assert_eq!(OperationId::new(5).next().as_u64(), 6);
        assert!(OperationId::default().is_zero());
    }

    #[test]
    fn operation_id_display() {
        assert_eq!(format!("{}", OperationId::new(42)), "op:42");
    }

    #[test]
    fn burst_range_contains() {
        let range = BurstRange::new(2, 4);
        assert!(!range.contains(OperationId::new(1)));
        assert!(range.contains(OperationId::new(2)));
        assert!(range.contains(OperationId::new(4)));
        assert!(!range.contains(OperationId::new(5)));
        assert_eq!(range.to_string(), "[2, 4]");
    }
}
