//! Weekly availability: slots cached per organisation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::{ApiAvailabilitySlot, AvailabilitySlot};
use crate::store::ScopeDimension;
use crate::sync::{CollectionConfig, ScopeLoader, ScopeStatus, ScopedCollection};

pub const BY_ORGANISATION: &str = "organisation";

/// Source of raw weekly availability for one organisation.
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    async fn fetch_availability(
        &self,
        organisation_id: &str,
    ) -> anyhow::Result<Vec<ApiAvailabilitySlot>>;
}

struct AvailabilityLoader {
    source: Arc<dyn AvailabilitySource>,
}

#[async_trait]
impl ScopeLoader<ApiAvailabilitySlot> for AvailabilityLoader {
    async fn load(&self, scope_key: &str) -> anyhow::Result<Vec<ApiAvailabilitySlot>> {
        self.source.fetch_availability(scope_key).await
    }
}

fn organisation_key(slot: &AvailabilitySlot) -> Option<String> {
    Some(slot.organisation_id.clone())
}

fn map_slot(raw: ApiAvailabilitySlot) -> AvailabilitySlot {
    raw.to_slot()
}

/// Weekly availability slots cached per organisation.
pub struct AvailabilitySchedule {
    inner: ScopedCollection<AvailabilitySlot, ApiAvailabilitySlot>,
}

impl AvailabilitySchedule {
    pub fn new(source: Arc<dyn AvailabilitySource>) -> Self {
        let config = CollectionConfig {
            name: "availability",
            dimensions: vec![ScopeDimension::new(BY_ORGANISATION, organisation_key)],
            load_dimension: BY_ORGANISATION,
            map: map_slot,
            merge: None,
        };
        Self {
            inner: ScopedCollection::new(config, Arc::new(AvailabilityLoader { source })),
        }
    }

    /// Load the organisation's week unless already loading or loaded.
    pub async fn ensure_loaded(&self, organisation_id: &str) -> Result<(), FetchError> {
        self.inner.ensure_loaded(organisation_id).await
    }

    /// Force a refresh regardless of the load-once policy.
    pub async fn reload(&self, organisation_id: &str) -> Result<(), FetchError> {
        self.inner.load(organisation_id).await
    }

    pub fn for_organisation(&self, organisation_id: &str) -> Vec<AvailabilitySlot> {
        self.inner.get_by_scope(BY_ORGANISATION, organisation_id)
    }

    pub fn upsert(&self, slot: AvailabilitySlot) {
        self.inner.upsert(slot);
    }

    pub fn remove(&self, id: &str) {
        self.inner.remove(&id.to_string());
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn status(&self, organisation_id: &str) -> ScopeStatus {
        self.inner.status(organisation_id)
    }
}

// ============================================================================
// Tests
// ============================================================================
