//! Generic composition layer: an [`EntityStore`] plus status tracking and
//! single-flight load coordination around an injected loader and mapper.
//!
//! One `ScopedCollection` is constructed per entity kind by the thin
//! instantiations in [`crate::collections`]. All store mutations run
//! synchronously under the store lock; the only suspension point is the
//! awaited loader inside the coordinator.

use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::store::{Entity, EntityStore, ScopeDimension};
use crate::sync::coordinator::FetchCoordinator;
use crate::sync::status::{ScopeStatus, StatusTracker};

/// Asynchronous source of raw records for one scope. Implementations own the
/// actual network access; the sync layer treats them as opaque.
#[async_trait]
pub trait ScopeLoader<R>: Send + Sync {
    async fn load(&self, scope_key: &str) -> anyhow::Result<Vec<R>>;
}

/// Entity-specific repair for partial API responses, applied to each raw
/// record before mapping. `merge` receives the incoming raw record and the
/// previously cached domain record with the same id, if any, and returns the
/// effective raw record.
pub struct MergeRule<T: Entity, R> {
    pub raw_id: fn(&R) -> T::Id,
    pub merge: fn(R, Option<&T>) -> R,
}

impl<T: Entity, R> Clone for MergeRule<T, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Entity, R> Copy for MergeRule<T, R> {}

/// Declarative wiring for one collection.
pub struct CollectionConfig<T: Entity, R> {
    /// Collection name used in log output.
    pub name: &'static str,
    /// Secondary-index dimensions, in declaration order.
    pub dimensions: Vec<ScopeDimension<T>>,
    /// The dimension whose bucket a scoped load replaces.
    pub load_dimension: &'static str,
    /// Pure mapping from the wire shape to the domain shape.
    pub map: fn(R) -> T,
    /// Optional partial-response repair applied before mapping.
    pub merge: Option<MergeRule<T, R>>,
}

/// A cached, scope-partitioned entity collection synchronized from a remote
/// source.
pub struct ScopedCollection<T: Entity, R> {
    name: &'static str,
    load_dimension: &'static str,
    map: fn(R) -> T,
    merge: Option<MergeRule<T, R>>,
    store: RwLock<EntityStore<T>>,
    status: Mutex<StatusTracker>,
    coordinator: FetchCoordinator<Vec<R>>,
    loader: Arc<dyn ScopeLoader<R>>,
}

impl<T, R> ScopedCollection<T, R>
where
    T: Entity,
    R: Clone + Send + Sync + 'static,
{
    pub fn new(config: CollectionConfig<T, R>, loader: Arc<dyn ScopeLoader<R>>) -> Self {
        debug_assert!(
            config
                .dimensions
                .iter()
                .any(|d| d.name() == config.load_dimension),
            "load dimension {} must be declared",
            config.load_dimension
        );
        Self {
            name: config.name,
            load_dimension: config.load_dimension,
            map: config.map,
            merge: config.merge,
            store: RwLock::new(EntityStore::new(config.dimensions)),
            status: Mutex::new(StatusTracker::new()),
            coordinator: FetchCoordinator::new(),
            loader,
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load a scope unless it is already loading or has a success on record.
    pub async fn ensure_loaded(&self, scope_key: &str) -> Result<(), FetchError> {
        let needed = self
            .status
            .lock()
            .expect("status tracker poisoned")
            .needs_load(scope_key);
        if !needed {
            debug!(collection = self.name, scope = scope_key, "load skipped");
            return Ok(());
        }
        self.load(scope_key).await
    }

    /// Unconditionally load a scope. This is the forced-refresh path; most
    /// callers want [`ensure_loaded`](Self::ensure_loaded).
    pub async fn load(&self, scope_key: &str) -> Result<(), FetchError> {
        self.status
            .lock()
            .expect("status tracker poisoned")
            .start_loading(scope_key);

        let loader = Arc::clone(&self.loader);
        let owned_key = scope_key.to_string();
        let result = self
            .coordinator
            .request_load(scope_key, move || async move {
                loader.load(&owned_key).await
            })
            .await;

        match result {
            Ok(raw) => {
                self.apply_scoped(scope_key, &raw);
                self.status
                    .lock()
                    .expect("status tracker poisoned")
                    .end_loading(scope_key);
                info!(
                    collection = self.name,
                    scope = scope_key,
                    count = raw.len(),
                    "scope loaded"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    collection = self.name,
                    scope = scope_key,
                    error = %e,
                    "scope load failed"
                );
                self.status
                    .lock()
                    .expect("status tracker poisoned")
                    .set_error(scope_key, e.message());
                Err(e)
            }
        }
    }

    /// Map raw records (through the merge rule, when configured) and replace
    /// the scope's bucket with the outcome.
    fn apply_scoped(&self, scope_key: &str, raw: &[R]) {
        let mut store = self.store.write().expect("entity store poisoned");
        let mapped: Vec<T> = raw
            .iter()
            .map(|record| {
                let record = record.clone();
                let record = match &self.merge {
                    Some(rule) => {
                        let id = (rule.raw_id)(&record);
                        (rule.merge)(record, store.get(&id))
                    }
                    None => record,
                };
                (self.map)(record)
            })
            .collect();
        store.replace_for_scope(self.load_dimension, scope_key, mapped);
    }

    // =========================================================================
    // Read surface
    // =========================================================================

    pub fn get_by_scope(&self, dimension: &str, scope_key: &str) -> Vec<T> {
        self.store
            .read()
            .expect("entity store poisoned")
            .get_by_scope(dimension, scope_key)
    }

    pub fn get(&self, id: &T::Id) -> Option<T> {
        self.store
            .read()
            .expect("entity store poisoned")
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.store.read().expect("entity store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().expect("entity store poisoned").is_empty()
    }

    pub fn status(&self, scope_key: &str) -> ScopeStatus {
        self.status
            .lock()
            .expect("status tracker poisoned")
            .status(scope_key)
    }

    // =========================================================================
    // Mutation surface
    // =========================================================================

    pub fn replace_all(&self, items: Vec<T>) {
        self.store
            .write()
            .expect("entity store poisoned")
            .replace_all(items);
    }

    pub fn replace_for_scope(&self, dimension: &str, scope_key: &str, items: Vec<T>) {
        self.store
            .write()
            .expect("entity store poisoned")
            .replace_for_scope(dimension, scope_key, items);
    }

    pub fn upsert(&self, entity: T) {
        self.store.write().expect("entity store poisoned").upsert(entity);
    }

    pub fn remove(&self, id: &T::Id) {
        self.store.write().expect("entity store poisoned").remove(id);
    }

    /// Drop every cached entity and status record.
    pub fn clear(&self) {
        self.store.write().expect("entity store poisoned").clear();
        self.status.lock().expect("status tracker poisoned").clear();
    }

    pub fn start_loading(&self, scope_key: &str) {
        self.status
            .lock()
            .expect("status tracker poisoned")
            .start_loading(scope_key);
    }

    pub fn end_loading(&self, scope_key: &str) {
        self.status
            .lock()
            .expect("status tracker poisoned")
            .end_loading(scope_key);
    }

    pub fn set_error(&self, scope_key: &str, message: impl Into<String>) {
        self.status
            .lock()
            .expect("status tracker poisoned")
            .set_error(scope_key, message);
    }
}

// ============================================================================
// Tests
// ============================================================================
