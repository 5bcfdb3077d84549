//! HTTP handlers for the settlement service

pub mod health;
pub mod offline;
pub mod payments;
