//! Generic entity store: a primary id -> entity map plus declared secondary
//! indexes.
//!
//! Each [`ScopeDimension`] names one way a collection is partitioned (for
//! companions: by organisation and by parent) and supplies the extractor that
//! reads the scope key off an entity. A bucket maps a scope key to the
//! ordered, duplicate-free list of member ids. The store is a pure data
//! structure: no I/O, no async, and every mutation runs to completion before
//! the next one starts.
//!
//! A bucket that loses its last member stays present as an empty list, so
//! lookups never need existence checks.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use tracing::warn;

/// A record the store can hold: anything with a stable unique id.
pub trait Entity: Clone {
    type Id: Clone + Eq + Hash + fmt::Debug;

    fn id(&self) -> Self::Id;
}

/// A declared secondary-index dimension: a name plus the extractor that reads
/// the scope key off an entity. Entities for which the extractor returns
/// `None` are not indexed under this dimension.
pub struct ScopeDimension<T> {
    name: &'static str,
    key_of: fn(&T) -> Option<String>,
}

impl<T> ScopeDimension<T> {
    pub fn new(name: &'static str, key_of: fn(&T) -> Option<String>) -> Self {
        Self { name, key_of }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ScopeDimension<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ScopeDimension<T> {}

impl<T> fmt::Debug for ScopeDimension<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeDimension")
            .field("name", &self.name)
            .finish()
    }
}

/// Primary id -> entity map with one bucket index per declared dimension.
pub struct EntityStore<T: Entity> {
    entities: HashMap<T::Id, T>,
    dimensions: Vec<ScopeDimension<T>>,
    // Parallel to `dimensions`: scope key -> ordered member ids.
    buckets: Vec<HashMap<String, Vec<T::Id>>>,
}

impl<T: Entity> EntityStore<T> {
    pub fn new(dimensions: Vec<ScopeDimension<T>>) -> Self {
        let buckets = dimensions.iter().map(|_| HashMap::new()).collect();
        Self {
            entities: HashMap::new(),
            dimensions,
            buckets,
        }
    }

    fn dim_index(&self, dimension: &str) -> Option<usize> {
        let index = self.dimensions.iter().position(|d| d.name == dimension);
        if index.is_none() {
            warn!(dimension, "unknown scope dimension");
        }
        index
    }

    /// Discard everything and rebuild the primary map and every index from
    /// `items`. Used for a full, unscoped reload.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.entities.clear();
        for buckets in &mut self.buckets {
            buckets.clear();
        }
        for item in items {
            self.upsert(item);
        }
    }

    /// Replace the membership of one bucket, leaving every other scope key's
    /// data untouched. Ids dropped from the bucket are deleted from the
    /// primary map and pruned from every other dimension, since the entity no
    /// longer exists anywhere.
    pub fn replace_for_scope(&mut self, dimension: &str, scope_key: &str, items: Vec<T>) {
        let Some(dim) = self.dim_index(dimension) else {
            return;
        };

        let mut new_ids: Vec<T::Id> = Vec::with_capacity(items.len());
        let mut seen: HashSet<T::Id> = HashSet::with_capacity(items.len());
        for item in &items {
            let id = item.id();
            if seen.insert(id.clone()) {
                new_ids.push(id);
            }
        }

        let old_ids: Vec<T::Id> = self.buckets[dim]
            .get(scope_key)
            .cloned()
            .unwrap_or_default();
        for id in &old_ids {
            if !seen.contains(id) {
                self.remove(id);
            }
        }

        for item in items {
            self.upsert(item);
        }
        self.buckets[dim].insert(scope_key.to_string(), new_ids);
    }

    /// Insert or fully replace one entity, migrating index membership for
    /// every dimension whose scope key changed. Idempotent: repeating with an
    /// unchanged entity grows no bucket.
    pub fn upsert(&mut self, entity: T) {
        let id = entity.id();
        if let Some(previous) = self.entities.get(&id) {
            let moves: Vec<(usize, Option<String>, Option<String>)> = self
                .dimensions
                .iter()
                .enumerate()
                .filter_map(|(dim, dimension)| {
                    let old_key = (dimension.key_of)(previous);
                    let new_key = (dimension.key_of)(&entity);
                    (old_key != new_key).then_some((dim, old_key, new_key))
                })
                .collect();

            for (dim, old_key, new_key) in moves {
                if let Some(key) = old_key {
                    if let Some(members) = self.buckets[dim].get_mut(&key) {
                        members.retain(|member| member != &id);
                    }
                }
                if let Some(key) = new_key {
                    let members = self.buckets[dim].entry(key).or_default();
                    if !members.contains(&id) {
                        members.push(id.clone());
                    }
                }
            }
        } else {
            for (dim, dimension) in self.dimensions.iter().enumerate() {
                if let Some(key) = (dimension.key_of)(&entity) {
                    let members = self.buckets[dim].entry(key).or_default();
                    if !members.contains(&id) {
                        members.push(id.clone());
                    }
                }
            }
        }
        self.entities.insert(id, entity);
    }

    /// Remove an entity by id. Unknown ids are a no-op. Buckets the id is
    /// filtered out of stay present as empty lists.
    pub fn remove(&mut self, id: &T::Id) {
        if self.entities.remove(id).is_none() {
            return;
        }
        for buckets in &mut self.buckets {
            for members in buckets.values_mut() {
                members.retain(|member| member != id);
            }
        }
    }

    /// Entities under one scope key, in bucket order. Ids with no entry in
    /// the primary map are dropped rather than surfaced as an error; unknown
    /// dimensions and unknown scope keys read as empty.
    pub fn get_by_scope(&self, dimension: &str, scope_key: &str) -> Vec<T> {
        let Some(dim) = self.dim_index(dimension) else {
            return Vec::new();
        };
        match self.buckets[dim].get(scope_key) {
            Some(members) => members
                .iter()
                .filter_map(|id| self.entities.get(id).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Member ids under one scope key, in bucket order.
    pub fn ids_by_scope(&self, dimension: &str, scope_key: &str) -> Vec<T::Id> {
        let Some(dim) = self.dim_index(dimension) else {
            return Vec::new();
        };
        self.buckets[dim]
            .get(scope_key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entities.values()
    }

    /// Reset the primary map and every bucket to empty.
    pub fn clear(&mut self) {
        self.entities.clear();
        for buckets in &mut self.buckets {
            buckets.clear();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
