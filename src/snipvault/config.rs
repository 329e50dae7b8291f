use crate::error::Result;
use crate::model::SchemaVersion;
use crate::store::backend::StateStore;
use crate::store::KEY_CONFIG;
use serde::{Deserialize, Serialize};

/// User-facing configuration, persisted in the state store under `config`.
///
/// The schema preference is only consulted while no path-schema data exists;
/// once V2 data is present the factory's sticky rule outranks it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultConfig {
    #[serde(rename = "schemaVersion", default = "default_schema_version")]
    pub schema_version: SchemaVersion,
}

fn default_schema_version() -> SchemaVersion {
    SchemaVersion::V1
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
        }
    }
}

impl VaultConfig {
    /// Load the config from the state store, or defaults if absent.
    pub fn load(store: &impl StateStore) -> Result<Self> {
        match store.read(KEY_CONFIG)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Self::default()),
        }
    }

    /// Persist the config to the state store.
    pub fn save(&self, store: &impl StateStore) -> Result<()> {
        store.write(KEY_CONFIG, &serde_json::to_value(self)?)
    }
}
