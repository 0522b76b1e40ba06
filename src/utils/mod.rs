//! Utility functions and helpers

pub mod version;

pub use version::{VERSION, user_agent};
