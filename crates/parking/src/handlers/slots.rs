//! Slot inventory handlers

use axum::{extract::State, Json};
use serde::Serialize;

use parkforge_common::Result;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SlotResponse {
    pub slot_id: i32,
    pub status: String,
}

/// List every slot with its current occupancy state, ordered by id.
pub async fn list_slots(State(state): State<AppState>) -> Result<Json<Vec<SlotResponse>>> {
    let slots = state.repo.list_slots().await?;

    let response = slots
        .into_iter()
        .map(|slot| SlotResponse {
            slot_id: slot.slot_id,
            status: slot.slot_status().as_str().to_string(),
        })
        .collect();

    Ok(Json(response))
}
