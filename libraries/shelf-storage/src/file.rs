use crate::error::{Result, StorageError};
use crate::store::KeyValueStore;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store backed by a single JSON document on disk
///
/// The whole document is rewritten on every change, through a temporary file
/// and a rename, so a crash mid-write never leaves a truncated file behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`
    ///
    /// A missing file is treated as an empty store; it is created on the first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(StorageError::Corrupt {
                        path: path.display().to_string(),
                        reason: "top-level value is not an object".to_string(),
                    })
                }
                Err(e) => {
                    return Err(StorageError::Corrupt {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = values.len(), "Opened settings store");

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_vec_pretty(values)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock();
        let previous = values.insert(key.to_string(), value);

        if let Err(e) = self.flush(&values) {
            // Keep memory and disk in agreement
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut values = self.values.lock();
        let Some(previous) = values.remove(key) else {
            return Ok(false);
        };

        if let Err(e) = self.flush(&values) {
            values.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }

    fn entries(&self) -> Result<Vec<(String, Value)>> {
        let mut entries: Vec<(String, Value)> = self
            .values
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}
