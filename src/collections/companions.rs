//! Companion roster: companions cached per organisation, indexed both by
//! organisation and by parent.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::{ApiCompanion, Companion};
use crate::store::ScopeDimension;
use crate::sync::{CollectionConfig, ScopeLoader, ScopeStatus, ScopedCollection};

/// Index dimension names.
pub const BY_ORGANISATION: &str = "organisation";
pub const BY_PARENT: &str = "parent";

/// Source of raw companions for one organisation.
#[async_trait]
pub trait CompanionSource: Send + Sync {
    async fn fetch_companions(&self, organisation_id: &str) -> anyhow::Result<Vec<ApiCompanion>>;
}

struct CompanionLoader {
    source: Arc<dyn CompanionSource>,
}

#[async_trait]
impl ScopeLoader<ApiCompanion> for CompanionLoader {
    async fn load(&self, scope_key: &str) -> anyhow::Result<Vec<ApiCompanion>> {
        self.source.fetch_companions(scope_key).await
    }
}

fn organisation_key(companion: &Companion) -> Option<String> {
    Some(companion.organisation_id.clone())
}

fn parent_key(companion: &Companion) -> Option<String> {
    Some(companion.parent_id.clone())
}

fn map_companion(raw: ApiCompanion) -> Companion {
    raw.to_companion()
}

/// Companions cached per organisation, readable per organisation and per
/// parent.
pub struct CompanionRoster {
    inner: ScopedCollection<Companion, ApiCompanion>,
}

impl CompanionRoster {
    pub fn new(source: Arc<dyn CompanionSource>) -> Self {
        let config = CollectionConfig {
            name: "companions",
            dimensions: vec![
                ScopeDimension::new(BY_ORGANISATION, organisation_key),
                ScopeDimension::new(BY_PARENT, parent_key),
            ],
            load_dimension: BY_ORGANISATION,
            map: map_companion,
            merge: None,
        };
        Self {
            inner: ScopedCollection::new(config, Arc::new(CompanionLoader { source })),
        }
    }

    /// Load the organisation's companions unless already loading or loaded.
    pub async fn ensure_loaded(&self, organisation_id: &str) -> Result<(), FetchError> {
        self.inner.ensure_loaded(organisation_id).await
    }

    /// Force a refresh regardless of the load-once policy.
    pub async fn reload(&self, organisation_id: &str) -> Result<(), FetchError> {
        self.inner.load(organisation_id).await
    }

    pub fn for_organisation(&self, organisation_id: &str) -> Vec<Companion> {
        self.inner.get_by_scope(BY_ORGANISATION, organisation_id)
    }

    pub fn for_parent(&self, parent_id: &str) -> Vec<Companion> {
        self.inner.get_by_scope(BY_PARENT, parent_id)
    }

    pub fn get(&self, id: &str) -> Option<Companion> {
        self.inner.get(&id.to_string())
    }

    /// Insert or update a single companion, e.g. after a save round-trip.
    pub fn upsert(&self, companion: Companion) {
        self.inner.upsert(companion);
    }

    pub fn remove(&self, id: &str) {
        self.inner.remove(&id.to_string());
    }

    /// Replace one organisation's companions wholesale, leaving other
    /// organisations' data untouched.
    pub fn replace_for_organisation(&self, organisation_id: &str, companions: Vec<Companion>) {
        self.inner
            .replace_for_scope(BY_ORGANISATION, organisation_id, companions);
    }

    pub fn replace_all(&self, companions: Vec<Companion>) {
        self.inner.replace_all(companions);
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn status(&self, organisation_id: &str) -> ScopeStatus {
        self.inner.status(organisation_id)
    }

    pub fn start_loading(&self, organisation_id: &str) {
        self.inner.start_loading(organisation_id);
    }

    pub fn end_loading(&self, organisation_id: &str) {
        self.inner.end_loading(organisation_id);
    }

    pub fn set_error(&self, organisation_id: &str, message: impl Into<String>) {
        self.inner.set_error(organisation_id, message);
    }
}

// ============================================================================
// Tests
// ============================================================================
