//! HTTP handlers for the slot/session manager

pub mod health;
pub mod sessions;
pub mod slots;
