//! Inventory catalog: items cached per organisation, with the turnover
//! endpoint folded into the same logical load and a merge rule that keeps
//! known batches when a narrower response omits them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;
use crate::models::{ApiBatch, ApiInventoryItem, ApiTurnoverEntry, InventoryItem};
use crate::store::ScopeDimension;
use crate::sync::{CollectionConfig, MergeRule, ScopeLoader, ScopeStatus, ScopedCollection};

pub const BY_ORGANISATION: &str = "organisation";

/// Source of raw inventory data for one organisation. Items and turnover are
/// separate endpoints upstream but belong to one logical load.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn fetch_items(&self, organisation_id: &str) -> anyhow::Result<Vec<ApiInventoryItem>>;
    async fn fetch_turnover(&self, organisation_id: &str)
        -> anyhow::Result<Vec<ApiTurnoverEntry>>;
}

struct InventoryLoader {
    source: Arc<dyn InventorySource>,
}

#[async_trait]
impl ScopeLoader<ApiInventoryItem> for InventoryLoader {
    async fn load(&self, scope_key: &str) -> anyhow::Result<Vec<ApiInventoryItem>> {
        let (items, turnover) = tokio::join!(
            self.source.fetch_items(scope_key),
            self.source.fetch_turnover(scope_key),
        );
        let mut items = items?;
        let turnover = turnover?;

        let rates: HashMap<&str, f64> = turnover
            .iter()
            .map(|entry| (entry.item_id.as_str(), entry.turnover_rate))
            .collect();
        for item in &mut items {
            if let Some(rate) = rates.get(item.id.as_str()) {
                item.turnover_rate = Some(*rate);
            }
        }
        debug!(
            items = items.len(),
            rates = rates.len(),
            "inventory load merged turnover"
        );
        Ok(items)
    }
}

fn organisation_key(item: &InventoryItem) -> Option<String> {
    Some(item.organisation_id.clone())
}

fn map_item(raw: ApiInventoryItem) -> InventoryItem {
    raw.to_item()
}

fn item_id(raw: &ApiInventoryItem) -> String {
    raw.id.clone()
}

/// Keep previously known batches when a narrower response omits them.
///
/// The update endpoint returns items without batch records; letting those
/// overwrite a prior full read would regress the cache. Incoming batch data,
/// when present, always wins.
fn preserve_known_batches(
    mut raw: ApiInventoryItem,
    previous: Option<&InventoryItem>,
) -> ApiInventoryItem {
    if !raw.batches.is_empty() {
        return raw;
    }
    if let Some(previous) = previous {
        if !previous.batches.is_empty() {
            raw.batches = previous.batches.iter().map(ApiBatch::from_cached).collect();
        }
    }
    raw
}

/// Inventory items cached per organisation.
pub struct InventoryCatalog {
    inner: ScopedCollection<InventoryItem, ApiInventoryItem>,
}

impl InventoryCatalog {
    pub fn new(source: Arc<dyn InventorySource>) -> Self {
        let config = CollectionConfig {
            name: "inventory",
            dimensions: vec![ScopeDimension::new(BY_ORGANISATION, organisation_key)],
            load_dimension: BY_ORGANISATION,
            map: map_item,
            merge: Some(MergeRule {
                raw_id: item_id,
                merge: preserve_known_batches,
            }),
        };
        Self {
            inner: ScopedCollection::new(config, Arc::new(InventoryLoader { source })),
        }
    }

    /// Load the organisation's inventory unless already loading or loaded.
    pub async fn ensure_loaded(&self, organisation_id: &str) -> Result<(), FetchError> {
        self.inner.ensure_loaded(organisation_id).await
    }

    /// Force a refresh regardless of the load-once policy.
    pub async fn reload(&self, organisation_id: &str) -> Result<(), FetchError> {
        self.inner.load(organisation_id).await
    }

    pub fn for_organisation(&self, organisation_id: &str) -> Vec<InventoryItem> {
        self.inner.get_by_scope(BY_ORGANISATION, organisation_id)
    }

    pub fn get(&self, id: &str) -> Option<InventoryItem> {
        self.inner.get(&id.to_string())
    }

    /// Insert or update a single item, e.g. after a stock adjustment.
    pub fn upsert(&self, item: InventoryItem) {
        self.inner.upsert(item);
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

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::NaiveDate;

    use super::*;
    use crate::models::Batch;
    use crate::sync::LoadStatus;

    fn api_item(id: &str, organisation_id: &str, batches: Vec<ApiBatch>) -> ApiInventoryItem {
        ApiInventoryItem {
            id: id.to_string(),
            organisation_id: organisation_id.to_string(),
            name: format!("item {}", id),
            unit: Some("tablet".to_string()),
            stock_quantity: 100.0,
            turnover_rate: None,
            batches,
        }
    }

    fn api_batch(id: &str, quantity: f64) -> ApiBatch {
        ApiBatch {
            id: id.to_string(),
            lot_number: Some(format!("LOT-{}", id)),
            expiry_date: Some("2027-01-31".to_string()),
            quantity,
        }
    }

    struct StubSource {
        item_calls: AtomicUsize,
        turnover_calls: AtomicUsize,
        items: Mutex<Vec<ApiInventoryItem>>,
        turnover: Mutex<anyhow::Result<Vec<ApiTurnoverEntry>>>,
    }

    impl StubSource {
        fn new(items: Vec<ApiInventoryItem>, turnover: Vec<ApiTurnoverEntry>) -> Arc<Self> {
            Arc::new(Self {
                item_calls: AtomicUsize::new(0),
                turnover_calls: AtomicUsize::new(0),
                items: Mutex::new(items),
                turnover: Mutex::new(Ok(turnover)),
            })
        }

        fn set_items(&self, items: Vec<ApiInventoryItem>) {
            *self.items.lock().unwrap() = items;
        }

        fn fail_turnover(&self, message: &str) {
            *self.turnover.lock().unwrap() = Err(anyhow::anyhow!(message.to_string()));
        }
    }

    #[async_trait]
    impl InventorySource for StubSource {
        async fn fetch_items(
            &self,
            _organisation_id: &str,
        ) -> anyhow::Result<Vec<ApiInventoryItem>> {
            self.item_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.items.lock().unwrap().clone())
        }

        async fn fetch_turnover(
            &self,
            _organisation_id: &str,
        ) -> anyhow::Result<Vec<ApiTurnoverEntry>> {
            self.turnover_calls.fetch_add(1, Ordering::SeqCst);
            match &*self.turnover.lock().unwrap() {
                Ok(entries) => Ok(entries.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_load_folds_turnover_into_items() {
        let source = StubSource::new(
            vec![api_item("i1", "org1", vec![]), api_item("i2", "org1", vec![])],
            vec![ApiTurnoverEntry {
                item_id: "i1".to_string(),
                turnover_rate: 12.5,
            }],
        );
        let catalog = InventoryCatalog::new(source.clone());

        catalog.ensure_loaded("org1").await.unwrap();

        assert_eq!(source.item_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.turnover_calls.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.get("i1").unwrap().turnover_rate, Some(12.5));
        assert!(catalog.get("i2").unwrap().turnover_rate.is_none());
    }

    #[tokio::test]
    async fn test_narrow_reload_keeps_known_batches() {
        let source = StubSource::new(
            vec![api_item("i1", "org1", vec![api_batch("b1", 60.0)])],
            vec![],
        );
        let catalog = InventoryCatalog::new(source.clone());
        catalog.ensure_loaded("org1").await.unwrap();

        // The narrower endpoint omits batches but updates stock.
        let mut narrow = api_item("i1", "org1", vec![]);
        narrow.stock_quantity = 40.0;
        source.set_items(vec![narrow]);
        catalog.reload("org1").await.unwrap();

        let item = catalog.get("i1").unwrap();
        assert_eq!(item.stock_quantity, 40.0);
        assert_eq!(item.batches.len(), 1);
        assert_eq!(item.batches[0].lot_number.as_deref(), Some("LOT-b1"));
        assert_eq!(
            item.batches[0].expiry_date,
            NaiveDate::from_ymd_opt(2027, 1, 31)
        );
    }

    #[tokio::test]
    async fn test_incoming_batches_always_win() {
        let source = StubSource::new(
            vec![api_item("i1", "org1", vec![api_batch("b1", 60.0)])],
            vec![],
        );
        let catalog = InventoryCatalog::new(source.clone());
        catalog.ensure_loaded("org1").await.unwrap();

        source.set_items(vec![api_item("i1", "org1", vec![api_batch("b2", 30.0)])]);
        catalog.reload("org1").await.unwrap();

        let item = catalog.get("i1").unwrap();
        assert_eq!(item.batches.len(), 1);
        assert_eq!(item.batches[0].id, "b2");
    }

    #[test]
    fn test_merge_without_cached_item_passes_through() {
        let raw = api_item("i1", "org1", vec![]);
        let merged = preserve_known_batches(raw.clone(), None);
        assert!(merged.batches.is_empty());

        let cached = InventoryItem {
            id: "i1".to_string(),
            organisation_id: "org1".to_string(),
            name: "item i1".to_string(),
            unit: None,
            stock_quantity: 10.0,
            turnover_rate: None,
            batches: vec![Batch {
                id: "b1".to_string(),
                lot_number: None,
                expiry_date: None,
                quantity: 10.0,
            }],
        };
        let merged = preserve_known_batches(raw, Some(&cached));
        assert_eq!(merged.batches.len(), 1);
        assert_eq!(merged.batches[0].id, "b1");
    }

    #[tokio::test]
    async fn test_turnover_failure_fails_the_whole_load() {
        let source = StubSource::new(vec![api_item("i1", "org1", vec![])], vec![]);
        source.fail_turnover("turnover endpoint down");
        let catalog = InventoryCatalog::new(source.clone());

        let err = catalog
            .ensure_loaded("org1")
            .await
            .expect_err("load should fail");
        assert!(err.message().contains("turnover endpoint down"));
        assert_eq!(catalog.status("org1").status, LoadStatus::Error);
        assert!(catalog.for_organisation("org1").is_empty());
    }
}
