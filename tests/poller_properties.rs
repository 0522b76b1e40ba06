//! Poller behaviour under paused time
//!
//! Backoff growth, retry-after hints, cancellation, idempotent submission and
//! the session bounds, observed through a scripted service.

use pretty_assertions::assert_eq;
use rustmaps::session::{Backoff, PollPolicy, PollSession, Poller};
use rustmaps::{
    CancellationToken, Error, ErrorKind, MapIdentity, MapStatus, RawResponse, RustmapsGeneric,
    SessionState,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

mod common;

use common::{ScriptedService, Step, TestConfig};

fn identity() -> MapIdentity {
    MapIdentity::new(12345, 4500).unwrap()
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_monotonic_and_capped() {
    let mut steps = vec![Step::Generating; 12];
    steps.push(Step::Completed);
    let service = ScriptedService::new(steps);
    let rustmaps = TestConfig::scripted(&service);

    rustmaps.request_map(identity().into()).await.unwrap();

    let gaps = service.poll_gaps();
    assert_eq!(gaps.len(), 12);
    for pair in gaps.windows(2) {
        assert!(pair[1] >= pair[0], "delays shrank: {:?}", gaps);
    }
    assert!(gaps.iter().all(|gap| *gap <= secs(16)));
    assert_eq!(gaps[0], secs(2));
    assert_eq!(*gaps.last().unwrap(), secs(16));
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_hint_beats_computed_backoff() {
    let service = ScriptedService::new(vec![Step::RateLimited(secs(10)), Step::Completed]);
    let rustmaps = TestConfig::scripted(&service);

    rustmaps.request_map(identity().into()).await.unwrap();

    let gaps = service.poll_gaps();
    assert!(gaps[0] >= secs(10), "polled again after {:?}", gaps[0]);
}

#[tokio::test(start_paused = true)]
async fn test_hint_above_max_delay_is_honoured() {
    let service = ScriptedService::new(vec![Step::RateLimited(secs(45)), Step::Completed]);
    let rustmaps = TestConfig::scripted(&service);

    rustmaps.request_map(identity().into()).await.unwrap();
    assert_eq!(service.poll_gaps()[0], secs(45));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_returns_cancelled_within_one_interval() {
    let service = ScriptedService::new(vec![Step::Generating]);
    let rustmaps = TestConfig::scripted(&service);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(secs(7)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = rustmaps
        .request_map_with_cancel(identity().into(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { .. }), "got {:?}", err);
    // polls at 0, 2 and 6; the 8 s sleep is interrupted at 7
    assert_eq!(started.elapsed(), secs(7));
    assert_eq!(service.poll_times().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_waits_submit_once() {
    let service = ScriptedService::new(vec![
        Step::Staging,
        Step::Staging,
        Step::Generating,
        Step::Completed,
    ]);
    let rustmaps = Arc::new(TestConfig::scripted(&service));

    let first = tokio::spawn({
        let rustmaps = Arc::clone(&rustmaps);
        async move { rustmaps.request_map(identity().into()).await }
    });
    let second = tokio::spawn({
        let rustmaps = Arc::clone(&rustmaps);
        async move { rustmaps.request_map(identity().into()).await }
    });

    let (first, second) = (first.await.unwrap(), second.await.unwrap());
    assert_eq!(first.unwrap().identity, identity());
    assert_eq!(second.unwrap().identity, identity());
    assert_eq!(service.submissions(), 1);
    assert!(!rustmaps.is_in_flight(&identity()));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_waits_learn_of_rejected_submission() {
    let service = ScriptedService::with_submission(
        vec![Step::NotFound],
        RawResponse::new(400, json!({"reason": "Invalid size"}).to_string()),
        secs(1),
    );
    let rustmaps = Arc::new(TestConfig::scripted(&service));

    let started = Instant::now();
    let waits: Vec<_> = (0..2)
        .map(|_| {
            let rustmaps = Arc::clone(&rustmaps);
            tokio::spawn(async move { rustmaps.request_map(identity().into()).await })
        })
        .collect();

    for wait in waits {
        let err = wait.await.unwrap().unwrap_err();
        assert_eq!(err.service_kind(), Some(ErrorKind::MalformedResponse), "got {:?}", err);
    }
    assert_eq!(service.submissions(), 2);
    assert!(service.served_history().is_empty());
    assert!(started.elapsed() < secs(5));
    assert!(!rustmaps.is_in_flight(&identity()));
}

#[tokio::test(start_paused = true)]
async fn test_failed_acknowledgement_is_generation_failure() {
    let service = ScriptedService::with_submission(
        vec![Step::Generating],
        RawResponse::new(200, json!({"mapId": "map-1", "state": "Failed"}).to_string()),
        Duration::ZERO,
    );
    let rustmaps = TestConfig::scripted(&service);

    let err = rustmaps.request_map(identity().into()).await.unwrap_err();

    assert!(matches!(err, Error::GenerationFailed { .. }), "got {:?}", err);
    assert!(service.served_history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_distinct_identities_submit_separately() {
    let service = ScriptedService::new(vec![Step::Completed]);
    let rustmaps = TestConfig::scripted(&service);
    let other = MapIdentity::new(54321, 4500).unwrap();

    let (a, b) = tokio::join!(
        rustmaps.request_map(identity().into()),
        rustmaps.request_map(other.into())
    );
    assert_eq!(a.unwrap().identity, identity());
    assert_eq!(b.unwrap().identity, other);
    assert_eq!(service.submissions(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_status_right_after_submit_is_never_completed() {
    let service = ScriptedService::new(vec![Step::Staging, Step::Completed]);
    let rustmaps = TestConfig::scripted(&service);

    let submitted = rustmaps
        .request_map_nowait(identity().into())
        .await
        .unwrap();
    let status = rustmaps.check_status(&identity()).await.unwrap();

    assert!(matches!(submitted, MapStatus::Pending | MapStatus::Generating));
    assert!(matches!(status, MapStatus::Pending | MapStatus::Generating));
}

#[tokio::test(start_paused = true)]
async fn test_generation_failure_is_typed() {
    let service = ScriptedService::new(vec![Step::Generating, Step::Failed("Render timeout")]);
    let rustmaps = TestConfig::scripted(&service);

    let err = rustmaps.request_map(identity().into()).await.unwrap_err();
    match err {
        Error::GenerationFailed { identity: failed, reason } => {
            assert_eq!(failed, identity());
            assert_eq!(reason, "Render timeout");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_propagates_without_retry() {
    let service = ScriptedService::new(vec![Step::Unauthorized, Step::Completed]);
    let rustmaps = TestConfig::scripted(&service);

    let err = rustmaps.request_map(identity().into()).await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ErrorKind::Unauthorized));
    assert_eq!(service.poll_times().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_end_errored() {
    let service = ScriptedService::new(vec![Step::Unavailable]);
    let provider = TestConfig::scripted(&service);
    let policy = PollPolicy {
        max_attempts: 5,
        ..provider.poll_policy().clone()
    };
    let poller = Poller::new(provider.client(), policy);
    let mut session = PollSession::new(identity(), poller.policy());

    let err = poller
        .run(&mut session, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.service_kind(), Some(ErrorKind::ServiceUnavailable));
    assert_eq!(session.state(), SessionState::Errored);
    assert_eq!(session.attempts(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_max_wait_ends_timed_out() {
    let service = ScriptedService::new(vec![Step::Generating]);
    let rustmaps = TestConfig::scripted(&service).with_poll_policy(PollPolicy {
        max_wait: secs(30),
        max_attempts: 1000,
        ..PollPolicy::default()
    });

    let started = Instant::now();
    let err = rustmaps.request_map(identity().into()).await.unwrap_err();

    assert!(matches!(err, Error::TimedOut { .. }), "got {:?}", err);
    assert_eq!(started.elapsed(), secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_max_wait_setting_ends_on_attempts() {
    let service = ScriptedService::new(vec![Step::Generating]);
    let mut settings = TestConfig::fast();
    settings.polling.max_wait_secs = u64::MAX;
    settings.polling.max_attempts = 3;
    let rustmaps = RustmapsGeneric::with_transport(settings, Arc::clone(&service)).unwrap();

    let err = rustmaps.request_map(identity().into()).await.unwrap_err();

    assert!(matches!(err, Error::TimedOut { attempts: 3, .. }), "got {:?}", err);
    assert_eq!(service.poll_gaps(), [secs(2), secs(4)]);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_while_staging_keeps_polling() {
    let service = ScriptedService::new(vec![Step::NotFound, Step::NotFound, Step::Completed]);
    let rustmaps = TestConfig::scripted(&service);

    let map = rustmaps.request_map(identity().into()).await.unwrap();
    assert_eq!(map.identity, identity());
    assert_eq!(service.served_history(), ["NotFound", "NotFound", "Completed"]);
}

#[test]
fn test_backoff_schedule_from_policy_defaults() {
    let policy = PollPolicy::default();
    let mut backoff = Backoff::new(policy.base_delay, policy.multiplier, policy.max_delay);
    let delays: Vec<_> = (0..4).map(|_| backoff.next_delay(None)).collect();
    assert_eq!(
        delays,
        [
            Duration::from_millis(2000),
            Duration::from_millis(3000),
            Duration::from_millis(4500),
            Duration::from_millis(6750)
        ]
    );
}
