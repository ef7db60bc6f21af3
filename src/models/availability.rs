//! Weekly availability models.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::store::Entity;

/// One recurring weekly availability slot on an organisation's calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilitySlot {
    pub id: String,
    pub organisation_id: String,
    pub practitioner_id: Option<String>,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Entity for AvailabilitySlot {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// Wire shape returned by the weekly availability endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAvailabilitySlot {
    pub id: String,
    #[serde(rename = "organisationId")]
    pub organisation_id: String,
    #[serde(rename = "practitionerId", default)]
    pub practitioner_id: Option<String>,
    /// 0 = Monday .. 6 = Sunday.
    pub weekday: u8,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
}

impl ApiAvailabilitySlot {
    /// Convert to the domain shape used by the store and the UI.
    pub fn to_slot(&self) -> AvailabilitySlot {
        AvailabilitySlot {
            id: self.id.clone(),
            organisation_id: self.organisation_id.clone(),
            practitioner_id: self.practitioner_id.clone(),
            weekday: weekday_from_index(self.weekday),
            start: parse_time(&self.start_time),
            end: parse_time(&self.end_time),
        }
    }
}

fn weekday_from_index(index: u8) -> Weekday {
    match index % 7 {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// The API sends "HH:MM" for most slots and "HH:MM:SS" for imported ones.
fn parse_time(value: &str) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .unwrap_or(NaiveTime::MIN)
}
