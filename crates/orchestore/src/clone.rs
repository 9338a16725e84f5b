//! Conversion across the storage boundary.
//!
//! Anything handed to a store is turned into an owned `serde_json::Value`,
//! and anything handed back is decoded into a fresh value. Caller and store
//! never share memory, so mutating a value after `write` or after `read`
//! cannot reach stored state.
//!
//! The round trip only preserves what JSON can represent. Non-finite floats
//! come back as `null` and maps with non-string keys are rejected with
//! [`StoreError::Serialize`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, StoreError};

/// Convert a value into its stored JSON form.
pub fn to_stored<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(StoreError::Serialize)
}

/// Decode a stored JSON value into a fresh `T`.
///
/// `key` is only used to label the error.
pub fn from_stored<T: DeserializeOwned>(key: &str, stored: &Value) -> Result<T> {
    T::deserialize(stored).map_err(|source| StoreError::Decode {
        key: key.to_string(),
        source,
    })
}

/// Deep-copy a value through its JSON representation.
pub fn safe_clone<T: Serialize + DeserializeOwned>(value: &T) -> Result<T> {
    let stored = to_stored(value)?;
    serde_json::from_value(stored).map_err(StoreError::Serialize)
}
