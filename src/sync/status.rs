//! Per-scope load lifecycle tracking.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Lifecycle of one scope's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    Error,
}

/// Status record for one scope key. Scopes never seen read as idle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeStatus {
    pub status: LoadStatus,
    pub error: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl Default for ScopeStatus {
    fn default() -> Self {
        Self {
            status: LoadStatus::Idle,
            error: None,
            last_fetched_at: None,
        }
    }
}

impl ScopeStatus {
    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    pub fn is_loaded(&self) -> bool {
        self.status == LoadStatus::Loaded
    }
}

/// Tracks the load lifecycle per scope key and decides whether a fresh fetch
/// is needed.
#[derive(Debug, Default)]
pub struct StatusTracker {
    scopes: HashMap<String, ScopeStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, scope_key: &str) -> ScopeStatus {
        self.scopes.get(scope_key).cloned().unwrap_or_default()
    }

    /// Whether a load should be issued for this scope.
    ///
    /// Loads are once per scope: skip while a load is in progress, and skip
    /// once a success is on record - including after a later failure, so a
    /// transient error does not invalidate data the UI already shows.
    /// Callers wanting fresh data bypass this by invoking the loader
    /// directly.
    pub fn needs_load(&self, scope_key: &str) -> bool {
        match self.scopes.get(scope_key) {
            Some(scope) => scope.status != LoadStatus::Loading && scope.last_fetched_at.is_none(),
            None => true,
        }
    }

    /// Mark a scope as loading. Creates the record on first use; an explicit
    /// call is also how `error` and `loaded` transition back to `loading`.
    pub fn start_loading(&mut self, scope_key: &str) {
        let scope = self.scopes.entry(scope_key.to_string()).or_default();
        scope.status = LoadStatus::Loading;
        scope.error = None;
    }

    /// Mark a scope as successfully loaded, stamping the success time.
    pub fn end_loading(&mut self, scope_key: &str) {
        let scope = self.scopes.entry(scope_key.to_string()).or_default();
        scope.status = LoadStatus::Loaded;
        scope.error = None;
        scope.last_fetched_at = Some(Utc::now());
    }

    /// Record a scope-level failure. A previous success timestamp is kept so
    /// the load-once policy stays sticky.
    pub fn set_error(&mut self, scope_key: &str, message: impl Into<String>) {
        let scope = self.scopes.entry(scope_key.to_string()).or_default();
        scope.status = LoadStatus::Error;
        scope.error = Some(message.into());
    }

    /// Forget every scope; everything reads as idle again.
    pub fn clear(&mut self) {
        self.scopes.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
