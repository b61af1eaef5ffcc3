//! Stable record identifiers derived from natural keys.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Byte placed between natural-key fields before hashing.
pub const KEY_SEPARATOR: u8 = 0x1f;

/// Width of a rendered [`RecordId`] in hex characters.
pub const RECORD_ID_WIDTH: usize = 64;

/// Fixed-width storage identifier for one logical record.
///
/// The identifier is the BLAKE3 digest of the natural-key fields joined with
/// [`KEY_SEPARATOR`], rendered as lowercase hex. Field order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn from_key<S: AsRef<str>>(fields: &[S]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for (index, field) in fields.iter().enumerate() {
            if index > 0 {
                hasher.update(&[KEY_SEPARATOR]);
            }
            hasher.update(field.as_ref().as_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_keys_hash_identically() {
        let first = RecordId::from_key(&["AAPL", "2024-01-02"]);
        let second = RecordId::from_key(&[String::from("AAPL"), String::from("2024-01-02")]);
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), RECORD_ID_WIDTH);
        assert!(first.as_str().chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn any_differing_field_changes_the_identifier() {
        let base = RecordId::from_key(&["AAPL", "2024-01-02"]);
        assert_ne!(base, RecordId::from_key(&["MSFT", "2024-01-02"]));
        assert_ne!(base, RecordId::from_key(&["AAPL", "2024-01-03"]));
    }

    #[test]
    fn field_boundaries_are_part_of_the_key() {
        let left = RecordId::from_key(&["Apple_Inc", "news"]);
        let right = RecordId::from_key(&["Apple", "Inc_news"]);
        assert_ne!(left, right);
    }
}
