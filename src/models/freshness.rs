use std::fmt;

use serde::{Deserialize, Serialize};

/// Presence of an article relative to the most recent refresh of its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Freshness {
    /// Added to the store by the latest refresh (or directly).
    #[default]
    New,
    /// Present in the latest refresh and already stored.
    Current,
    /// Stored, but missing from the latest refresh.
    Stale,
}

impl Freshness {
    pub fn is_stale(self) -> bool {
        self == Freshness::Stale
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Freshness::New => "New",
            Freshness::Current => "Current",
            Freshness::Stale => "Stale",
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
