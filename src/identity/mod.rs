// =============================================================================
// Identity - Canonical Country Keys
// =============================================================================
//
// Every country that enters the system is keyed by its ISO 3166-1 alpha-3 code:
// catalog records, detail records, map features, persisted bucket-list
// snapshots and route parameters all pass through `normalize` first.
//
// Display names are NEVER used for matching. The provider's common name for a
// country ("Côte d'Ivoire" vs "Ivory Coast") is not stable across datasets, so a
// name-keyed lookup silently misses.
//
// Accepted inputs:
//   - alpha-3 ("FRA", " fra ")      -> FRA
//   - alpha-2 ("FR", "fr")          -> FRA (via the ISO table in codes.rs)
//
// Rejected inputs (InvalidIdentity):
//   - placeholders used by map datasets for "not applicable" ("-99", "N/A", ...)
//   - anything that is not 2 or 3 ASCII alphanumerics after trimming

pub mod blocklist;
pub mod codes;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use blocklist::Blocklist;

/// Canonical identity key: an upper-case ISO 3166-1 alpha-3 code
///
/// Stored inline as three ASCII bytes so it is `Copy` and cheap to hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalKey([u8; 3]);

impl CanonicalKey {
    /// Build a key from bytes that already passed validation
    fn from_validated(bytes: &[u8]) -> Self {
        let mut code = [0u8; 3];
        code.copy_from_slice(&bytes[..3]);
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII alphanumerics ever reach the array
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalKey({})", self.as_str())
    }
}

impl FromStr for CanonicalKey {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

impl TryFrom<String> for CanonicalKey {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl TryFrom<&str> for CanonicalKey {
    type Error = IdentityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        normalize(value)
    }
}

impl From<CanonicalKey> for String {
    fn from(key: CanonicalKey) -> Self {
        key.as_str().to_string()
    }
}

/// Errors raised at the identity boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The raw value cannot be mapped to a well-formed alpha-3 code
    #[error("invalid country code '{raw}': {reason}")]
    InvalidIdentity { raw: String, reason: &'static str },
}

fn invalid(raw: &str, reason: &'static str) -> IdentityError {
    IdentityError::InvalidIdentity {
        raw: raw.to_string(),
        reason,
    }
}

/// Normalize any raw country code into its canonical alpha-3 key
///
/// Pure function: no logging, no lookups beyond the static ISO table.
pub fn normalize(raw: &str) -> Result<CanonicalKey, IdentityError> {
    let clean = raw.trim().to_ascii_uppercase();

    if clean.is_empty() {
        return Err(invalid(raw, "empty code"));
    }
    if codes::is_sentinel(&clean) {
        return Err(invalid(raw, "placeholder code"));
    }
    if !clean.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid(raw, "code must be ASCII letters or digits"));
    }

    match clean.len() {
        3 => Ok(CanonicalKey::from_validated(clean.as_bytes())),
        2 => codes::alpha2_to_alpha3(&clean).ok_or_else(|| invalid(raw, "unknown alpha-2 code")),
        _ => Err(invalid(raw, "code must be 2 or 3 characters")),
    }
}

/// Resolve a map feature's raw identity, honoring the interaction block-list
///
/// Returns `None` for missing, unnormalizable and block-listed identities.
pub fn resolve_feature_identity(raw: Option<&str>, blocklist: &Blocklist) -> Option<CanonicalKey> {
    let key = normalize(raw?).ok()?;
    if blocklist.contains(&key) {
        return None;
    }
    Some(key)
}
