//! JSON serialization helpers for deterministic output.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Error type for serialization operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// JSON deserialization failed.
    #[error("JSON deserialization failed: {0}")]
    Deserialize(serde_json::Error),

    /// UTF-8 encoding error.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a value to deterministic JSON: 2-space indentation and a
/// trailing newline. Field order follows the type's declaration order.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    let mut json = String::from_utf8(buffer)?;
    json.push('\n');
    Ok(json)
}

/// Same as [`to_json_stable`], as bytes for direct file writing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    to_json_stable(value).map(String::into_bytes)
}

/// Deserializes JSON from bytes.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes).map_err(SerializationError::Deserialize)
}
