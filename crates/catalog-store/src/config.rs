use serde::{Deserialize, Serialize};

/// How the index build treats a key that appears on more than one line.
///
/// `save` always rejects a key that is already indexed; this policy only
/// governs files that already contain duplicates when they are opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The later line replaces the earlier index entry.
    #[default]
    LastWins,
    /// The earlier line keeps its index entry.
    FirstWins,
    /// Opening the store fails with `StoreError::DuplicateKey`.
    Reject,
}

/// Configuration for a [`JsonLineStore`](crate::JsonLineStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Longest line accepted when reading or writing, newline excluded.
    pub max_line_len: usize,
    pub duplicate_policy: DuplicatePolicy,
}

/// Default line length limit (1 MiB).
pub const DEFAULT_MAX_LINE_LEN: usize = 1024 * 1024;

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl StoreConfig {
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }
}
