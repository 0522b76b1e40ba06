//! Version information

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent sent with every API request
pub fn user_agent() -> String {
    format!("rustmaps-rs/{}", VERSION)
}
