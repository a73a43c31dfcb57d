// Interaction block-list for map features
//
// Territories the provider does not serve detail records for (or whose status
// is disputed) still render on the map, but never hover, never navigate and
// never take part in selection lookups.

use std::collections::HashSet;

use super::{normalize, CanonicalKey};

/// Codes excluded from map interaction unless configured otherwise
pub const DEFAULT_BLOCKED_CODES: &[&str] = &[
    "ATA", // Antarctica
    "ATF", // French Southern Territories
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocklist {
    keys: HashSet<CanonicalKey>,
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::from_codes(DEFAULT_BLOCKED_CODES)
    }
}

impl Blocklist {
    /// An empty block-list: every resolvable feature is interactive
    pub fn empty() -> Self {
        Self {
            keys: HashSet::new(),
        }
    }

    /// Build a block-list from raw codes. Unnormalizable entries are logged and skipped.
    pub fn from_codes<S: AsRef<str>>(codes: &[S]) -> Self {
        let mut keys = HashSet::with_capacity(codes.len());
        for raw in codes {
            match normalize(raw.as_ref()) {
                Ok(key) => {
                    keys.insert(key);
                }
                Err(e) => log::warn!("Ignoring block-list entry: {}", e),
            }
        }
        Self { keys }
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Block-listed keys in code order
    pub fn keys(&self) -> Vec<CanonicalKey> {
        let mut keys: Vec<CanonicalKey> = self.keys.iter().copied().collect();
        keys.sort();
        keys
    }
}
