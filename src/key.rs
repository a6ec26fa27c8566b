//! Resource identity.

use serde::{Deserialize, Serialize};

/// Opaque identifier drawn from the fixed universe `[0, universe_size)`.
///
/// Two completions with the same key are the same resource as far as
/// residency is concerned; the pool never holds both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey(pub u32);

impl ResourceKey {
    /// Position of the key in the universe.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ResourceKey {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
