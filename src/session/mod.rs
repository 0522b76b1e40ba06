//! Generation sessions
//!
//! The poller drives one submitted map to a terminal state with bounded,
//! backed-off polling; the facade composes it with the map client.

pub mod backoff;
pub mod manager;
pub mod poller;

pub use backoff::Backoff;
pub use manager::{Rustmaps, RustmapsGeneric};
pub use poller::{PollPolicy, PollSession, Poller, SessionState};
