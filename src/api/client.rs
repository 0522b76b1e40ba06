//! Map resource client
//!
//! Single-shot calls against the rustmaps API: submit a generation request,
//! poll a map's status, fetch a finished map and list monument-filter presets.

use tracing::{debug, info};

use super::decoder::{classify, decode};
use super::rate_limit::RequestBudget;
use crate::config::Settings;
use crate::error::{ErrorKind, ServiceError};
use crate::transport::{ApiRequest, HttpTransport, RawResponse, Transport};
use crate::types::{
    FilterDescriptor, GenerationRequestParams, MapData, MapIdentity, MapProgress, MapResult,
    MapStatus,
};
use crate::{Error, Result};

/// What one poll of a map revealed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Request accepted, generation not started
    Pending,
    Generating,
    /// The service does not know the map (yet)
    NotFound,
    Failed { reason: Option<String> },
    Completed(Box<MapResult>),
}

impl Observation {
    pub fn status(&self) -> MapStatus {
        match self {
            Self::Pending => MapStatus::Pending,
            Self::Generating => MapStatus::Generating,
            Self::NotFound => MapStatus::NotFound,
            Self::Failed { .. } => MapStatus::Failed,
            Self::Completed(_) => MapStatus::Completed,
        }
    }
}

/// Source of map status observations
///
/// Implemented by [`MapClient`]; the poller only depends on this trait so it
/// can be driven by test doubles.
#[async_trait::async_trait]
pub trait MapStatusProvider: Send + Sync {
    /// Poll the service once for the map's state
    async fn observe(&self, identity: &MapIdentity) -> Result<Observation>;
}

#[async_trait::async_trait]
impl<P: MapStatusProvider + ?Sized> MapStatusProvider for std::sync::Arc<P> {
    async fn observe(&self, identity: &MapIdentity) -> Result<Observation> {
        (**self).observe(identity).await
    }
}

/// Client for the map endpoints of the rustmaps API
#[derive(Debug)]
pub struct MapClient<T: Transport = HttpTransport> {
    transport: T,
    api_key: String,
    user_agent: String,
    budget: Option<RequestBudget>,
}

impl MapClient<HttpTransport> {
    /// Create a client with an HTTP transport described by the settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let transport = HttpTransport::new(&settings.api, &settings.network)?;
        Ok(Self::new(transport, settings.api.api_key.clone())
            .with_user_agent(settings.network.user_agent.clone())
            .with_budget(RequestBudget::from_settings(&settings.rate_limit)))
    }
}

impl<T: Transport> MapClient<T> {
    /// Create a client over any transport, with the default request budget
    pub fn new(transport: T, api_key: impl Into<String>) -> Self {
        let limits = crate::config::RateLimitSettings::default();
        Self {
            transport,
            api_key: api_key.into(),
            user_agent: crate::utils::user_agent(),
            budget: RequestBudget::from_settings(&limits),
        }
    }

    /// Replace the client-side request budget; `None` disables it
    pub fn with_budget(mut self, budget: Option<RequestBudget>) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Transport this client sends through
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Attach authentication headers, check the budget and send
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse> {
        if let Some(budget) = &self.budget
            && let Err(wait) = budget.try_acquire()
        {
            debug!(path = %request.path, wait_ms = wait.as_millis() as u64, "Request budget exhausted");
            return Err(ServiceError::new(
                ErrorKind::RateLimited,
                429,
                "Client-side request budget exhausted",
            )
            .with_retry_after(Some(wait))
            .into());
        }

        let request = request
            .with_header("X-API-Key", self.api_key.clone())
            .with_header("User-Agent", self.user_agent.clone())
            .with_header("accept", "application/json");

        self.transport.send(request).await
    }

    /// Submit a generation request
    ///
    /// A 409 means generation is already underway for the identity; it is
    /// reported as [`MapStatus::Generating`] (or `Pending` if the service says
    /// so) rather than as an error, so the caller proceeds to polling. A body
    /// naming the failed state is reported as [`MapStatus::Failed`] under
    /// either status code.
    pub async fn create_request(&self, params: &GenerationRequestParams) -> Result<MapStatus> {
        let identity = params.identity;
        let request = ApiRequest::post(identity.path()).with_query(params.query()?);
        let response = self.execute(request).await?;

        match decode::<MapProgress>(&response) {
            Ok(progress) => {
                info!(
                    seed = identity.seed(),
                    size = identity.size(),
                    map_id = ?progress.map_id,
                    "Map generation requested"
                );
                Ok(match progress.status_or(MapStatus::Pending) {
                    MapStatus::Generating => MapStatus::Generating,
                    MapStatus::Failed => MapStatus::Failed,
                    _ => MapStatus::Pending,
                })
            }
            Err(e) if e.kind == ErrorKind::Conflict => {
                let progress = progress_from(&e);
                info!(
                    seed = identity.seed(),
                    size = identity.size(),
                    map_id = ?progress.map_id,
                    "Map generation already in progress"
                );
                Ok(match progress.status_or(MapStatus::Generating) {
                    MapStatus::Pending => MapStatus::Pending,
                    MapStatus::Failed => MapStatus::Failed,
                    _ => MapStatus::Generating,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Poll the status of a map once
    pub async fn get_status(&self, identity: &MapIdentity) -> Result<MapStatus> {
        Ok(self.observe(identity).await?.status())
    }

    /// Fetch a map that is expected to be generated already
    ///
    /// Never triggers generation. A 404 surfaces as a `NotFound`
    /// [`ServiceError`] and an unfinished map as `Conflict`.
    pub async fn get_map(&self, identity: &MapIdentity) -> Result<MapResult> {
        let response = self.execute(status_request(identity)).await?;
        let data: MapData = decode(&response)?;
        Ok(data.into_result(*identity))
    }

    /// Fetch a map by the UUID the service assigned to it
    pub async fn get_map_by_id(&self, map_id: &str) -> Result<MapResult> {
        if !is_uuid(map_id) {
            return Err(Error::validation_with_value(
                "map_id",
                "not a valid UUID",
                map_id,
            ));
        }

        let response = self
            .execute(ApiRequest::get(format!("/maps/{}", map_id)))
            .await?;
        let data: MapData = decode(&response)?;

        let (Some(seed), Some(size)) = (data.seed, data.size) else {
            return Err(ServiceError::new(
                ErrorKind::MalformedResponse,
                response.status,
                "Map data is missing seed or size",
            )
            .with_raw_body(response.body)
            .into());
        };
        let identity = MapIdentity::new(seed, size)
            .map_err(|e| {
                Error::from(
                    ServiceError::new(ErrorKind::MalformedResponse, response.status, e.to_string())
                        .with_raw_body(response.body.clone()),
                )
            })?
            .with_staging(data.is_staging.unwrap_or(false));

        Ok(data.into_result(identity))
    }

    /// List the monument-filter presets, in the order the service returns them
    pub async fn get_monument_filters(&self) -> Result<Vec<FilterDescriptor>> {
        let response = self.execute(ApiRequest::get("/monuments/filters")).await?;
        let filters: Vec<FilterDescriptor> = decode(&response)?;
        debug!(count = filters.len(), "Fetched monument filters");
        Ok(filters)
    }
}

#[async_trait::async_trait]
impl<T: Transport> MapStatusProvider for MapClient<T> {
    async fn observe(&self, identity: &MapIdentity) -> Result<Observation> {
        let response = self.execute(status_request(identity)).await?;

        let Some(error) = classify(&response) else {
            let data: MapData = decode(&response)?;
            return Ok(Observation::Completed(Box::new(data.into_result(*identity))));
        };

        match error.kind {
            ErrorKind::NotFound => Ok(Observation::NotFound),
            ErrorKind::Conflict => {
                let progress = progress_from(&error);
                Ok(match progress.status_or(MapStatus::Generating) {
                    MapStatus::Pending => Observation::Pending,
                    MapStatus::Failed => Observation::Failed {
                        reason: progress.reason,
                    },
                    // only a 200 carries the finished map
                    _ => Observation::Generating,
                })
            }
            _ => Err(error.into()),
        }
    }
}

fn status_request(identity: &MapIdentity) -> ApiRequest {
    ApiRequest::get(identity.path()).with_query([(
        "staging".to_string(),
        identity.is_staging().to_string(),
    )])
}

/// Read the in-progress description carried by a 409
///
/// An empty or non-JSON body describes nothing and yields the defaults.
fn progress_from(error: &ServiceError) -> MapProgress {
    error
        .raw_body
        .as_deref()
        .and_then(|body| serde_json::from_str(body).ok())
        .unwrap_or_default()
}

fn is_uuid(value: &str) -> bool {
    value.len() == 36
        && value.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}
