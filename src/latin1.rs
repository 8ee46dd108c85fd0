//! ISO-8859-1 transport encoding for binary audio.
//!
//! Every byte maps to the code point of the same value, so any byte sequence
//! survives a trip through a JSON string and back unchanged.

use serde::{Deserialize, Deserializer, Serializer};

use crate::error::LLMError;

/// Maps each byte to the character with the same code point.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`encode`]. Fails on characters above U+00FF.
pub fn decode(text: &str) -> Result<Vec<u8>, LLMError> {
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            u8::try_from(c).map_err(|_| {
                LLMError::InvalidRequest(format!(
                    "character {c:?} at position {i} is outside the latin-1 range"
                ))
            })
        })
        .collect()
}

/// `#[serde(serialize_with = "latin1::serialize")]`
pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&encode(bytes))
}

/// `#[serde(deserialize_with = "latin1::deserialize")]`
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    decode(&text).map_err(serde::de::Error::custom)
}
