//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use rustmaps::{
    ApiRequest, Method, RawResponse, Result, Rustmaps, RustmapsGeneric, Settings, Transport,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use wiremock::MockServer;

/// One scripted answer to a status poll
#[derive(Debug, Clone)]
pub enum Step {
    Staging,
    Generating,
    Completed,
    Failed(&'static str),
    NotFound,
    RateLimited(Duration),
    Unavailable,
    Unauthorized,
}

impl Step {
    fn respond(&self, path: &str) -> RawResponse {
        match self {
            Step::Staging => RawResponse::new(409, json!({"state": "Staging"}).to_string()),
            Step::Generating => {
                RawResponse::new(409, json!({"state": "Generating"}).to_string())
            }
            Step::Completed => RawResponse::new(200, MockData::map_body(path).to_string()),
            Step::Failed(reason) => RawResponse::new(
                409,
                json!({"state": "Failed", "reason": reason}).to_string(),
            ),
            Step::NotFound => RawResponse::new(404, ""),
            Step::RateLimited(wait) => RawResponse::new(429, "").with_retry_after(*wait),
            Step::Unavailable => RawResponse::new(503, ""),
            Step::Unauthorized => RawResponse::new(401, json!({"reason": "Invalid key"}).to_string()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Step::Staging => "Staging",
            Step::Generating => "Generating",
            Step::Completed => "Completed",
            Step::Failed(_) => "Failed",
            Step::NotFound => "NotFound",
            Step::RateLimited(_) => "RateLimited",
            Step::Unavailable => "Unavailable",
            Step::Unauthorized => "Unauthorized",
        }
    }
}

/// A request the scripted service received
#[derive(Debug, Clone)]
pub struct Received {
    pub request: ApiRequest,
    pub at: Instant,
    /// Name of the step served, for status polls
    pub served: Option<&'static str>,
}

/// In-memory rustmaps service driven by a script of poll answers
///
/// Submissions are accepted unless built with [`ScriptedService::with_submission`].
/// Status polls consume the script in order; the last step repeats once the
/// script runs out.
#[derive(Debug)]
pub struct ScriptedService {
    steps: Mutex<VecDeque<Step>>,
    received: Mutex<Vec<Received>>,
    submission: RawResponse,
    submit_delay: Duration,
}

impl ScriptedService {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Self::with_submission(
            steps,
            RawResponse::new(200, json!({"mapId": "map-1"}).to_string()),
            Duration::ZERO,
        )
    }

    /// Answer every submission with `submission`, after `delay`
    pub fn with_submission(steps: Vec<Step>, submission: RawResponse, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            received: Mutex::new(Vec::new()),
            submission,
            submit_delay: delay,
        })
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> usize {
        self.received()
            .iter()
            .filter(|r| r.request.method == Method::Post)
            .count()
    }

    /// Names of the steps served to status polls, in order
    pub fn served_history(&self) -> Vec<&'static str> {
        self.received().iter().filter_map(|r| r.served).collect()
    }

    /// Times at which status polls arrived
    pub fn poll_times(&self) -> Vec<Instant> {
        self.received()
            .iter()
            .filter(|r| r.served.is_some())
            .map(|r| r.at)
            .collect()
    }

    /// Gaps between consecutive status polls
    pub fn poll_gaps(&self) -> Vec<Duration> {
        self.poll_times().windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedService {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let at = Instant::now();
        if request.method == Method::Post {
            self.received.lock().unwrap().push(Received {
                request,
                at,
                served: None,
            });
            tokio::time::sleep(self.submit_delay).await;
            return Ok(self.submission.clone());
        }

        let step = {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        }
        .unwrap_or(Step::NotFound);

        let response = step.respond(&request.path);
        self.received.lock().unwrap().push(Received {
            request,
            at,
            served: Some(step.name()),
        });
        Ok(response)
    }
}

/// Test configuration factory
pub struct TestConfig;

impl TestConfig {
    /// Settings with a fast poll schedule and no client-side budget
    pub fn fast() -> Settings {
        let mut settings = Settings::with_api_key("test-api-key");
        settings.polling.base_delay_ms = 2000;
        settings.polling.multiplier = 2.0;
        settings.polling.max_delay_ms = 16_000;
        settings.polling.max_attempts = 20;
        settings.polling.max_wait_secs = 600;
        settings.rate_limit.enabled = false;
        settings
    }

    /// Facade over a scripted service
    pub fn scripted(service: &Arc<ScriptedService>) -> RustmapsGeneric<Arc<ScriptedService>> {
        RustmapsGeneric::with_transport(Self::fast(), Arc::clone(service)).unwrap()
    }
}

/// Test data factory
pub struct MockData;

impl MockData {
    /// Finished-map body for a `/maps/{seed}/{size}` path
    pub fn map_body(path: &str) -> serde_json::Value {
        let mut parts = path.trim_start_matches("/maps/").split('/');
        let seed: u64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let size: u64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        json!({
            "id": "474b4c64-ab86-4128-a075-e88737fa5820",
            "seed": seed,
            "size": size,
            "isStaging": false,
            "url": format!("https://rustmaps.com/map/{}_{}", size, seed),
            "imageUrl": "https://content.rustmaps.com/maps/map.png",
            "imageIconUrl": "https://content.rustmaps.com/maps/icon.png",
            "thumbnailUrl": "https://content.rustmaps.com/maps/thumb.png",
            "downloadUrl": "https://content.rustmaps.com/maps/map.map",
            "totalMonuments": 27,
            "monuments": []
        })
    }
}

/// Mock server factory
pub struct MockServerFactory;

impl MockServerFactory {
    pub async fn new() -> MockServer {
        MockServer::start().await
    }

    /// HTTP facade pointed at the mock server
    pub fn rustmaps_for(server: &MockServer) -> Rustmaps {
        let mut settings = TestConfig::fast();
        settings.api.base_url = server.uri();
        settings.polling.base_delay_ms = 10;
        settings.polling.max_delay_ms = 50;
        Rustmaps::from_settings(settings).unwrap()
    }
}

/// Test utilities
pub struct TestUtils;

impl TestUtils {
    /// Initialize test logger
    pub fn init_logger() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("debug")
            .try_init();
    }
}
