//! Parking slot entity
//!
//! One row per physical slot; `Occupied` always pairs with exactly one open
//! session. Status transitions happen only through conditional updates in the
//! repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Slot occupancy state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Available,
    Occupied,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "Available",
            SlotStatus::Occupied => "Occupied",
        }
    }
}

impl From<String> for SlotStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Occupied" => SlotStatus::Occupied,
            _ => SlotStatus::Available,
        }
    }
}

impl From<SlotStatus> for String {
    fn from(status: SlotStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parking_slots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub slot_id: i32,

    #[sea_orm(column_type = "Text")]
    pub status: String,
}

impl Model {
    /// Get the slot status as an enum; unknown values read as Available,
    /// matching the seeded default
    pub fn slot_status(&self) -> SlotStatus {
        SlotStatus::from(self.status.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(SlotStatus::from(String::from("Occupied")), SlotStatus::Occupied);
        assert_eq!(SlotStatus::from(String::from("Available")), SlotStatus::Available);
        // Unknown values read as Available, matching the seeded default
        assert_eq!(SlotStatus::from(String::from("garbage")), SlotStatus::Available);
        assert_eq!(String::from(SlotStatus::Occupied), "Occupied");
    }

    #[test]
    fn test_model_status_normalizes() {
        let slot = Model {
            slot_id: 1,
            status: "garbage".to_string(),
        };
        assert_eq!(slot.slot_status(), SlotStatus::Available);
        assert_eq!(slot.slot_status().as_str(), "Available");
    }
}
