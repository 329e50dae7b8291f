use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Abstract interface over the host's key-value state store.
/// This trait handles the "how" of persistence (file vs memory),
/// while the schema stores handle the "what" (records, caching, cascades).
///
/// The store offers no transactions: each `write` is individually durable at
/// best, and a failure between two writes leaves whichever completed in
/// place. Callers order their writes accordingly.
pub trait StateStore {
    /// Read the value stored under `key`. `Ok(None)` if the key is absent.
    fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Write `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Reads the record array under `key`, treating an absent key as empty.
pub fn read_records<T: DeserializeOwned>(store: &impl StateStore, key: &str) -> Result<Vec<T>> {
    match store.read(key)? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(Vec::new()),
    }
}

/// Writes a record array under `key`.
pub fn write_records<T: Serialize>(
    store: &impl StateStore,
    key: &str,
    records: &[T],
) -> Result<()> {
    store.write(key, &serde_json::to_value(records)?)
}

/// Reads a boolean flag under `key`, absent meaning `false`.
pub fn read_flag(store: &impl StateStore, key: &str) -> Result<bool> {
    Ok(matches!(store.read(key)?, Some(Value::Bool(true))))
}

/// Writes a boolean flag under `key`.
pub fn write_flag(store: &impl StateStore, key: &str, value: bool) -> Result<()> {
    store.write(key, &Value::Bool(value))
}
