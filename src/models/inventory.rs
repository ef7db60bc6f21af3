//! Inventory models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::Entity;

/// A stock batch belonging to an inventory item.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub id: String,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: f64,
}

/// An inventory item with its known stock batches.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItem {
    pub id: String,
    pub organisation_id: String,
    pub name: String,
    pub unit: Option<String>,
    pub stock_quantity: f64,
    /// Folded in from the turnover endpoint during a load.
    pub turnover_rate: Option<f64>,
    pub batches: Vec<Batch>,
}

impl Entity for InventoryItem {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Wire shape of a stock batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiBatch {
    pub id: String,
    #[serde(rename = "lotNumber", default)]
    pub lot_number: Option<String>,
    #[serde(rename = "expiryDate", default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub quantity: f64,
}

impl ApiBatch {
    pub fn to_batch(&self) -> Batch {
        Batch {
            id: self.id.clone(),
            lot_number: self.lot_number.clone(),
            expiry_date: self
                .expiry_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            quantity: self.quantity,
        }
    }

    /// Rebuild the wire shape from a cached domain batch, field by field.
    /// Used when a narrower response omits batches a prior full read had.
    pub fn from_cached(batch: &Batch) -> Self {
        Self {
            id: batch.id.clone(),
            lot_number: batch.lot_number.clone(),
            expiry_date: batch.expiry_date.map(|d| d.format("%Y-%m-%d").to_string()),
            quantity: batch.quantity,
        }
    }
}

/// Wire shape of the items endpoint. The narrower update endpoint omits
/// `batches`; `#[serde(default)]` keeps that an empty list rather than a
/// parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInventoryItem {
    pub id: String,
    #[serde(rename = "organisationId")]
    pub organisation_id: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(rename = "stockQuantity", default)]
    pub stock_quantity: f64,
    #[serde(rename = "turnoverRate", default)]
    pub turnover_rate: Option<f64>,
    #[serde(default)]
    pub batches: Vec<ApiBatch>,
}

impl ApiInventoryItem {
    /// Convert to the domain shape used by the store and the UI.
    pub fn to_item(&self) -> InventoryItem {
        InventoryItem {
            id: self.id.clone(),
            organisation_id: self.organisation_id.clone(),
            name: self.name.clone(),
            unit: self.unit.clone(),
            stock_quantity: self.stock_quantity,
            turnover_rate: self.turnover_rate,
            batches: self.batches.iter().map(ApiBatch::to_batch).collect(),
        }
    }
}

/// One row of the turnover endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTurnoverEntry {
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "turnoverRate")]
    pub turnover_rate: f64,
}
