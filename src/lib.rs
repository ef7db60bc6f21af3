//! In-memory synchronization layer for clinic data.
//!
//! `clinicsync` keeps independently fetched, independently scoped entity
//! collections (companions, weekly availability, inventory) consistent
//! between a remote API and a UI layer:
//!
//! - [`EntityStore`]: a primary id -> entity map with declared secondary
//!   indexes, one ordered bucket per scope key.
//! - [`FetchCoordinator`]: a single-flight registry so concurrent loads for
//!   one scope share a single underlying request.
//! - [`StatusTracker`]: per-scope load lifecycle (idle/loading/loaded/error)
//!   with a last-success timestamp driving the load-once policy.
//! - [`ScopedCollection`]: the composition of the three around an injected
//!   loader and a pure mapping function, instantiated per entity kind in
//!   [`collections`].
//!
//! The crate performs no I/O of its own: network access lives behind the
//! source traits in [`collections`], and nothing is persisted across runs -
//! the cache is memory-only and discarded on drop.

pub mod collections;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;

pub use error::FetchError;
pub use store::{Entity, EntityStore, ScopeDimension};
pub use sync::{
    CollectionConfig, FetchCoordinator, LoadStatus, MergeRule, ScopeLoader, ScopeStatus,
    ScopedCollection, StatusTracker,
};
