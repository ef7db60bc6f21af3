//! Concrete collection instantiations and their aggregate.

pub mod availability;
pub mod companions;
pub mod inventory;

pub use availability::{AvailabilitySchedule, AvailabilitySource};
pub use companions::{CompanionRoster, CompanionSource};
pub use inventory::{InventoryCatalog, InventorySource};

use std::sync::Arc;

/// Every collection cache for one running application.
///
/// Constructed once by the composing application and shared by reference;
/// nothing in this crate is a process-wide singleton.
pub struct ClinicCache {
    pub companions: CompanionRoster,
    pub availability: AvailabilitySchedule,
    pub inventory: InventoryCatalog,
}

impl ClinicCache {
    pub fn new(
        companions: Arc<dyn CompanionSource>,
        availability: Arc<dyn AvailabilitySource>,
        inventory: Arc<dyn InventorySource>,
    ) -> Self {
        Self {
            companions: CompanionRoster::new(companions),
            availability: AvailabilitySchedule::new(availability),
            inventory: InventoryCatalog::new(inventory),
        }
    }

    /// Drop every cached entity and status record across all collections.
    pub fn clear(&self) {
        self.companions.clear();
        self.availability.clear();
        self.inventory.clear();
    }
}
