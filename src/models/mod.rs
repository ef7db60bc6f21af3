//! Domain and wire models for the synced collections.
//!
//! Each entity kind has a domain shape consumed by the store and the UI, and
//! an `Api*` wire shape mirroring the remote JSON. Wire structs convert
//! through `to_*` methods; those conversions are the injected mappers. The
//! domain shapes carry no serde derives - they are never on the wire and
//! nothing in this layer is persisted.

pub mod availability;
pub mod companion;
pub mod inventory;

pub use availability::{ApiAvailabilitySlot, AvailabilitySlot};
pub use companion::{ApiCompanion, Companion};
pub use inventory::{ApiBatch, ApiInventoryItem, ApiTurnoverEntry, Batch, InventoryItem};
