//! Database configuration.

use std::num::NonZeroUsize;

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the database directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to fsync burst and snapshot files before publishing them.
    pub sync_on_close: bool,

    /// Rotate to a new burst after this many transactions (`None` = only on
    /// explicit rotation or close).
    pub rotate_after: Option<NonZeroUsize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_close: true,
            rotate_after: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fsync files before publishing them.
    #[must_use]
    pub const fn sync_on_close(mut self, value: bool) -> Self {
        self.sync_on_close = value;
        self
    }

    /// Sets the number of transactions per burst.
    #[must_use]
    pub const fn rotate_after(mut self, count: Option<NonZeroUsize>) -> Self {
        self.rotate_after = count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_close);
        assert!(config.rotate_after.is_none());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .sync_on_close(false)
            .rotate_after(NonZeroUsize::new(100));

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_close);
        assert_eq!(config.rotate_after.map(NonZeroUsize::get), Some(100));
    }
}
