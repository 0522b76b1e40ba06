//! # Public facade
//!
//! [`RustmapsGeneric`] composes the map client and the generation poller into
//! the operations callers use: request a map and wait for it, submit without
//! waiting, poll once, and fetch maps that already exist.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use rustmaps::{MapIdentity, Rustmaps};
//!
//! # tokio_test::block_on(async {
//! let rustmaps = Rustmaps::new("my-api-key")?;
//! let identity = MapIdentity::new(12345, 4500)?;
//!
//! let map = rustmaps.request_map(identity.into()).await?;
//! println!("Map ready at {:?}", map.url);
//! # Ok::<(), rustmaps::Error>(())
//! # });
//! ```
//!
//! ## Idempotence
//!
//! Waiting calls for the same [`MapIdentity`] share one submission: while a
//! request-and-wait call is in flight, concurrent calls for that identity
//! wait for its generation request to be accepted and then only poll. If the
//! submitting call fails or is cancelled before the service accepts the
//! request, a waiting call submits again itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::poller::{PollPolicy, Poller};
use crate::{
    Result,
    api::{MapClient, RequestBudget},
    config::Settings,
    transport::{HttpTransport, Transport},
    error::Error,
    types::{FilterDescriptor, GenerationRequestParams, MapIdentity, MapResult, MapStatus},
};

/// In-flight identities, each with a flag that turns true once the service
/// accepted the generation request
type Registry = Mutex<HashMap<MapIdentity, watch::Receiver<bool>>>;

/// Convenience alias for the facade over HTTP
pub type Rustmaps = RustmapsGeneric<HttpTransport>;

/// Client facade for the rustmaps.com map generation API
#[derive(Debug)]
pub struct RustmapsGeneric<T: Transport = HttpTransport> {
    settings: Arc<Settings>,
    client: MapClient<T>,
    policy: PollPolicy,
    /// Identities with a request-and-wait call in flight
    in_flight: Registry,
}

impl RustmapsGeneric<HttpTransport> {
    /// Create a facade with default settings and the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_settings(Settings::with_api_key(api_key))
    }

    /// Create a facade from loaded settings
    ///
    /// ```rust
    /// use rustmaps::{Rustmaps, Settings};
    ///
    /// let mut settings = Settings::with_api_key("my-api-key");
    /// settings.polling.max_wait_secs = 120;
    /// let rustmaps = Rustmaps::from_settings(settings).unwrap();
    /// assert_eq!(rustmaps.settings().polling.max_wait_secs, 120);
    /// ```
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let client = MapClient::from_settings(&settings)?;
        Ok(Self::assemble(settings, client))
    }
}

impl<T: Transport> RustmapsGeneric<T> {
    /// Create a facade over a custom transport
    pub fn with_transport(settings: Settings, transport: T) -> Result<Self> {
        settings.validate()?;
        let client = MapClient::new(transport, settings.api.api_key.clone())
            .with_user_agent(settings.network.user_agent.clone())
            .with_budget(RequestBudget::from_settings(&settings.rate_limit));
        Ok(Self::assemble(settings, client))
    }

    fn assemble(settings: Settings, client: MapClient<T>) -> Self {
        let policy = PollPolicy::from(&settings.polling);
        Self {
            settings: Arc::new(settings),
            client,
            policy,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the poll policy derived from the settings
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &MapClient<T> {
        &self.client
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Identity in the map pool selected by the settings
    pub fn identity(&self, seed: u32, size: u32) -> Result<MapIdentity> {
        Ok(MapIdentity::new(seed, size)?.with_staging(self.settings.api.staging))
    }

    /// Whether a request-and-wait call for the identity is in flight
    pub fn is_in_flight(&self, identity: &MapIdentity) -> bool {
        self.registry().contains_key(identity)
    }

    /// Request a map and wait until it is generated
    pub async fn request_map(&self, params: GenerationRequestParams) -> Result<MapResult> {
        self.request_map_with_cancel(params, &CancellationToken::new())
            .await
    }

    /// Request a map and wait until it is generated or `cancel` fires
    pub async fn request_map_with_cancel(
        &self,
        params: GenerationRequestParams,
        cancel: &CancellationToken,
    ) -> Result<MapResult> {
        let identity = params.identity;

        // Held until this call returns, including on cancellation
        let _guard = loop {
            match self.claim(identity) {
                Claim::Submit(guard) => {
                    self.submit(&params, cancel).await?;
                    guard.accepted();
                    break Some(guard);
                }
                Claim::Join(mut accepted) => {
                    debug!(
                        seed = identity.seed(),
                        size = identity.size(),
                        "Generation being submitted by another caller, waiting on it"
                    );
                    let joined = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled { identity }),
                        joined = async { accepted.wait_for(|accepted| *accepted).await.is_ok() } => joined,
                    };
                    if joined {
                        break None;
                    }
                    warn!(
                        seed = identity.seed(),
                        size = identity.size(),
                        "Other caller's submission did not go through, submitting again"
                    );
                }
            }
        };

        Poller::new(&self.client, self.policy.clone())
            .wait(identity, cancel)
            .await
    }

    /// Send the generation request, failing if the service rejects it
    async fn submit(
        &self,
        params: &GenerationRequestParams,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let identity = params.identity;
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled { identity }),
            status = self.client.create_request(params) => status?,
        };
        info!(
            seed = identity.seed(),
            size = identity.size(),
            staging = identity.is_staging(),
            status = %status,
            "Submitted map generation"
        );
        if status == MapStatus::Failed {
            return Err(Error::GenerationFailed {
                identity,
                reason: "generation request reported as failed".to_string(),
            });
        }
        Ok(())
    }

    /// Submit a generation request without waiting for it
    pub async fn request_map_nowait(&self, params: GenerationRequestParams) -> Result<MapStatus> {
        self.client.create_request(&params).await
    }

    /// Poll the status of a map once
    pub async fn check_status(&self, identity: &MapIdentity) -> Result<MapStatus> {
        self.client.get_status(identity).await
    }

    /// Fetch a map that has already been generated
    pub async fn get_existing_map(&self, identity: &MapIdentity) -> Result<MapResult> {
        self.client.get_map(identity).await
    }

    pub async fn get_map_by_id(&self, map_id: &str) -> Result<MapResult> {
        self.client.get_map_by_id(map_id).await
    }

    /// Monument-filter presets usable as `filter_id`
    pub async fn monument_filters(&self) -> Result<Vec<FilterDescriptor>> {
        self.client.get_monument_filters().await
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<MapIdentity, watch::Receiver<bool>>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the identity as in flight, or join the call that already has
    fn claim(&self, identity: MapIdentity) -> Claim<'_> {
        let mut registry = self.registry();
        if let Some(accepted) = registry.get(&identity) {
            return Claim::Join(accepted.clone());
        }
        let (accepted, receiver) = watch::channel(false);
        registry.insert(identity, receiver);
        Claim::Submit(InFlightGuard {
            registry: &self.in_flight,
            identity,
            accepted,
        })
    }
}

/// Outcome of claiming an identity
enum Claim<'a> {
    /// This call submits the generation request
    Submit(InFlightGuard<'a>),
    /// Another call is submitting; the flag turns true once it is accepted
    Join(watch::Receiver<bool>),
}

/// Removes its identity from the in-flight registry when dropped
///
/// Dropping the guard before [`InFlightGuard::accepted`] closes the channel
/// with the flag still false, which tells joined calls to submit again.
struct InFlightGuard<'a> {
    registry: &'a Registry,
    identity: MapIdentity,
    accepted: watch::Sender<bool>,
}

impl InFlightGuard<'_> {
    fn accepted(&self) {
        self.accepted.send_replace(true);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.identity);
    }
}
