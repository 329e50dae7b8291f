use super::backend::StateStore;
use super::context::ActiveStore;
use super::v1::IdStore;
use super::v2::PathStore;
use crate::error::Result;
use crate::model::SchemaVersion;

/// Picks the schema store to run on.
///
/// The path schema wins if configuration asks for it OR path-schema data is
/// already persisted — even when configuration says otherwise. Once V2 data
/// exists, silently reverting to the ID schema would orphan it, so its
/// presence is a sticky, irreversible signal.
pub fn create_store<B: StateStore + Clone>(
    backend: &B,
    preferred: SchemaVersion,
) -> Result<ActiveStore<B>> {
    // An unreadable v2 key is not the same as an absent one: stay on the
    // sticky side and let the v2 store surface the problem.
    let v2_present = match PathStore::has_data(backend) {
        Ok(present) => present,
        Err(err) => {
            tracing::warn!(error = %err, "could not inspect path-schema keys, assuming present");
            true
        }
    };

    if preferred == SchemaVersion::V2 || v2_present {
        Ok(ActiveStore::V2(PathStore::new(backend.clone())))
    } else {
        Ok(ActiveStore::V1(IdStore::new(backend.clone())))
    }
}
