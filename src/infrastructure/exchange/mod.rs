//! Adapters for the exchange's REST surface.

mod rest;

pub use rest::HttpExchangeRestClient;
