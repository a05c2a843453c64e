use crate::error::Result;
use crate::store::KeyValueStore;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;

/// In-memory store; values live as long as the store does
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.values.lock().remove(key).is_some())
    }

    fn entries(&self) -> Result<Vec<(String, Value)>> {
        Ok(self
            .values
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
