//! rustmaps HTTP API
//!
//! Response decoding, the client-side request budget and the map resource
//! client built on top of a [`Transport`](crate::transport::Transport).

pub mod client;
pub mod decoder;
pub mod rate_limit;

pub use client::{MapClient, MapStatusProvider, Observation};
pub use decoder::{classify, decode};
pub use rate_limit::RequestBudget;
