//! Configuration management for the rustmaps client
//!
//! This module handles loading and validating the settings the client is
//! constructed from.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{ApiSettings, NetworkSettings, PollSettings, RateLimitSettings, Settings};

// Environment variables are process-global; every test touching them takes this lock
#[cfg(test)]
pub(crate) static ENV_TEST_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
