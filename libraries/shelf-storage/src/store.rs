use crate::error::Result;
use serde_json::Value;

/// Persistent JSON values under string keys
///
/// Writes are synchronous: once `set` returns `Ok`, the value survives a
/// restart of the process (for durable implementations).
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `Ok(None)` if the key was never written
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a value, returning whether it existed
    fn remove(&self, key: &str) -> Result<bool>;

    /// All stored entries, sorted by key
    fn entries(&self) -> Result<Vec<(String, Value)>>;
}
