//! Application Layer
//!
//! Use cases orchestrate the domain against the ports; nothing here talks
//! to a concrete exchange or database directly.

pub mod ports;
pub mod use_cases;
