//! Content addressing for evaluation pairs.
//!
//! A [`CacheKey`] is the full 256-bit BLAKE3 digest of a pair's three fields. Fields are
//! joined with [`CACHE_KEY_SEPARATOR`] and each is length-prefixed, so separator text
//! inside an instruction or image path cannot make two different pairs hash alike.

use std::fmt;
use std::str::FromStr;

use blake3::Hasher;
use thiserror::Error;

use crate::constants::CACHE_KEY_SEPARATOR;
use crate::pairs::Pair;

/// Hex length of a rendered key.
pub const CACHE_KEY_HEX_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// 32-byte digest identifying one evaluation input.
pub struct CacheKey([u8; 32]);

#[derive(Debug, Error, PartialEq, Eq)]
/// Failure to parse a hex-rendered [`CacheKey`].
pub enum KeyParseError {
    #[error("cache key must be {CACHE_KEY_HEX_LEN} hex characters, got {len}")]
    Length { len: usize },

    #[error("cache key contains non-hex character at offset {offset}")]
    InvalidHex { offset: usize },
}

impl CacheKey {
    #[inline]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering used in the backing log.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for CacheKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != CACHE_KEY_HEX_LEN {
            return Err(KeyParseError::Length { len: s.len() });
        }
        if let Some(offset) = s.bytes().position(|b| !b.is_ascii_hexdigit()) {
            return Err(KeyParseError::InvalidHex { offset });
        }
        blake3::Hash::from_hex(s)
            .map(|hash| Self(*hash.as_bytes()))
            .map_err(|_| KeyParseError::InvalidHex { offset: 0 })
    }
}

impl serde::Serialize for CacheKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for CacheKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Derives the cache key for an (instruction, input, output) triple.
#[inline]
pub fn hash_pair_fields(instruction: &str, input_image: &str, output_image: &str) -> CacheKey {
    let mut hasher = Hasher::new();
    for (idx, field) in [instruction, input_image, output_image].iter().enumerate() {
        if idx > 0 {
            hasher.update(CACHE_KEY_SEPARATOR.as_bytes());
        }
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    CacheKey(*hasher.finalize().as_bytes())
}

/// Derives the cache key for a [`Pair`].
#[inline]
pub fn cache_key(pair: &Pair) -> CacheKey {
    hash_pair_fields(&pair.instruction, &pair.input_image, &pair.output_image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_cache_key_determinism() {
        let pair = Pair::new("make it blue", "a.png", "b.png");

        let key1 = cache_key(&pair);
        let key2 = cache_key(&pair);
        let key3 = cache_key(&pair.clone());

        assert_eq!(key1, key2);
        assert_eq!(key2, key3);
    }

    #[test]
    fn test_cache_key_field_sensitivity() {
        let base = hash_pair_fields("make it blue", "a.png", "b.png");

        assert_ne!(base, hash_pair_fields("make it red", "a.png", "b.png"));
        assert_ne!(base, hash_pair_fields("make it blue", "c.png", "b.png"));
        assert_ne!(base, hash_pair_fields("make it blue", "a.png", "c.png"));
        assert_ne!(base, hash_pair_fields("make it blue", "b.png", "a.png"));
    }

    #[test]
    fn test_cache_key_separator_prevents_ambiguity() {
        let k1 = hash_pair_fields("a|||b", "c", "d");
        let k2 = hash_pair_fields("a", "b|||c", "d");
        let k3 = hash_pair_fields("a", "b", "c|||d");
        let k4 = hash_pair_fields("ab", "", "cd");

        let unique: HashSet<_> = [k1, k2, k3, k4].into_iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_cache_key_no_collisions_in_corpus() {
        let mut keys = HashSet::new();
        for instruction in 0..20 {
            for input in 0..10 {
                for output in 0..10 {
                    let key = hash_pair_fields(
                        &format!("instruction {instruction}"),
                        &format!("inputs/{input}.png"),
                        &format!("outputs/{output}.png"),
                    );
                    keys.insert(key);
                }
            }
        }
        assert_eq!(keys.len(), 20 * 10 * 10);
    }

    #[test]
    fn test_cache_key_hex_roundtrip() {
        let key = hash_pair_fields("x", "y", "z");
        let hex = key.to_hex();

        assert_eq!(hex.len(), CACHE_KEY_HEX_LEN);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hex.parse::<CacheKey>().unwrap(), key);
        assert_eq!(key.to_string(), hex);
    }

    #[test]
    fn test_cache_key_parse_rejects_bad_input() {
        assert_eq!(
            "abc".parse::<CacheKey>(),
            Err(KeyParseError::Length { len: 3 })
        );

        let mut bad = "0".repeat(CACHE_KEY_HEX_LEN);
        bad.replace_range(10..11, "g");
        assert_eq!(
            bad.parse::<CacheKey>(),
            Err(KeyParseError::InvalidHex { offset: 10 })
        );
    }

    #[test]
    fn test_cache_key_unicode_fields() {
        let key = hash_pair_fields("把背景换成星空", "输入.png", "输出.png");
        assert_eq!(key.as_bytes().len(), 32);
        assert_ne!(key, hash_pair_fields("把背景换成海滩", "输入.png", "输出.png"));
    }

    #[test]
    fn test_cache_key_serde_as_hex_string() {
        let key = hash_pair_fields("x", "y", "z");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key.to_hex()));

        let back: CacheKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
