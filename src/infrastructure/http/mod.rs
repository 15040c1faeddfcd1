//! Operational HTTP surface (§11).

mod controller;

pub use controller::{create_router, StatusSnapshot, StatusState};
