//! rustmaps - client for the rustmaps.com map generation API
//!
//! rustmaps.com renders Rust game-world maps from a seed and a size. Maps are
//! generated asynchronously: a request is submitted, the service stages and
//! renders the map, and the client polls until the map is ready or the job
//! fails. This crate models that job as an explicit state machine with
//! bounded, backed-off polling and cancellation, and returns exactly one
//! typed result or error per operation.
//!
//! # Features
//!
//! - **Request and wait**: submit a map and poll it to completion
//! - **Idempotent waits**: concurrent waits for one map submit it once
//! - **Typed failures**: every HTTP status maps to one [`ErrorKind`]
//! - **Rate limits**: retry-after hints are honoured, and a client-side budget
//!   keeps requests under the per-key limits
//! - **Pluggable transport**: any [`Transport`] can stand in for HTTP
//!
//! # Architecture
//!
//! - [`transport`]: one request in, one status and body out
//! - [`api`]: response decoding and single-shot map endpoints
//! - [`session`]: the generation poller and the [`Rustmaps`] facade
//!
//! # Examples
//!
//! ```rust,no_run
//! use rustmaps::{CancellationToken, GenerationRequestParams, MapIdentity, Rustmaps};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let rustmaps = Rustmaps::new("my-api-key")?;
//! let params = GenerationRequestParams::new(MapIdentity::new(12345, 4500)?).with_barren(true);
//!
//! let cancel = CancellationToken::new();
//! let map = rustmaps.request_map_with_cancel(params, &cancel).await?;
//! println!("{} monuments, image at {:?}", map.image.monument_count, map.image_url);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;
pub mod types;
pub mod utils;

pub use api::{MapClient, MapStatusProvider, Observation};
pub use config::{ConfigLoader, Settings};
pub use error::{Error, ErrorKind, Result, ServiceError};
pub use session::{PollPolicy, Rustmaps, RustmapsGeneric, SessionState};
pub use tokio_util::sync::CancellationToken;
pub use transport::{ApiRequest, HttpTransport, Method, RawResponse, Transport};
pub use types::{
    FilterDescriptor, GenerationRequestParams, ImageFileType, ImageMetadata, MapIdentity,
    MapResult, MapStatus,
};
