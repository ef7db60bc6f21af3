//! Companion (patient) models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::Entity;

/// A companion animal registered with a clinic organisation.
#[derive(Debug, Clone, PartialEq)]
pub struct Companion {
    pub id: String,
    pub organisation_id: String,
    /// The owning client ("pet parent").
    pub parent_id: String,
    pub name: String,
    pub species: Option<String>,
    pub breed: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub deceased: bool,
}

impl Entity for Companion {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Wire shape returned by the companions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCompanion {
    pub id: String,
    #[serde(rename = "organisationId")]
    pub organisation_id: String,
    #[serde(rename = "parentId")]
    pub parent_id: String,
    pub name: String,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(rename = "dateOfBirth", default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub deceased: Option<bool>,
}

impl ApiCompanion {
    /// Convert to the domain shape used by the store and the UI.
    pub fn to_companion(&self) -> Companion {
        Companion {
            id: self.id.clone(),
            organisation_id: self.organisation_id.clone(),
            parent_id: self.parent_id.clone(),
            name: self.name.clone(),
            species: self.species.clone(),
            breed: self.breed.clone(),
            date_of_birth: self
                .date_of_birth
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            deceased: self.deceased.unwrap_or(false),
        }
    }
}
