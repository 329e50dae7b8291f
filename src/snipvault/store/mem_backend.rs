use super::backend::StateStore;
use crate::error::{Result, VaultError};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// In-memory state store for testing.
///
/// Cloning yields a second handle onto the same underlying map, matching the
/// production situation where both schema stores and the context share one
/// host state store. Uses `RefCell` for interior mutability since snipvault
/// is single-threaded.
#[derive(Clone, Default)]
pub struct MemState {
    entries: Rc<RefCell<HashMap<String, Value>>>,
    simulate_write_error: Rc<RefCell<Option<String>>>,
}

impl MemState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write (and remove) fail. Pass `None` to fail
    /// all keys, or a key to fail writes to that key only.
    pub fn set_simulate_write_error(&self, key: Option<&str>) {
        *self.simulate_write_error.borrow_mut() =
            Some(key.unwrap_or("*").to_string());
    }

    /// Stop simulating write errors.
    pub fn clear_simulate_write_error(&self) {
        *self.simulate_write_error.borrow_mut() = None;
    }

    /// Test helper: the set of keys currently present.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        match self.simulate_write_error.borrow().as_deref() {
            Some("*") => Err(VaultError::Store("Simulated write error".to_string())),
            Some(k) if k == key => Err(VaultError::Store("Simulated write error".to_string())),
            _ => Ok(()),
        }
    }
}

impl StateStore for MemState {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &Value) -> Result<()> {
        self.check_writable(key)?;
        self.entries.borrow_mut().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check_writable(key)?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_write_remove() {
        let state = MemState::new();
        assert!(state.read("k").unwrap().is_none());

        state.write("k", &json!([1, 2])).unwrap();
        assert_eq!(state.read("k").unwrap(), Some(json!([1, 2])));

        state.remove("k").unwrap();
        assert!(state.read("k").unwrap().is_none());

        // Removing an absent key is a no-op.
        state.remove("k").unwrap();
    }

    #[test]
    fn test_clones_share_state() {
        let state = MemState::new();
        let other = state.clone();

        state.write("k", &json!("v")).unwrap();
        assert_eq!(other.read("k").unwrap(), Some(json!("v")));
    }

    #[test]
    fn test_simulated_write_error() {
        let state = MemState::new();
        state.set_simulate_write_error(None);
        assert!(state.write("k", &json!(1)).is_err());

        state.clear_simulate_write_error();
        assert!(state.write("k", &json!(1)).is_ok());
    }

    #[test]
    fn test_simulated_write_error_single_key() {
        let state = MemState::new();
        state.set_simulate_write_error(Some("bad"));
        assert!(state.write("bad", &json!(1)).is_err());
        assert!(state.write("good", &json!(1)).is_ok());
    }
}
