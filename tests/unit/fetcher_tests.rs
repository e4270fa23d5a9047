#[path = "../common/mod.rs"]
mod common;

use httpmock::{Method::GET, MockServer};
use podtato::aggregate::fan_out;
use podtato::config::PeerTimeouts;
use podtato::discovery::{ExternalLocator, LocatorError, ServiceLocator};
use podtato::domain::{BodyPart, PartResult};
use podtato::fetcher::{FetchStage, PeerClient};
use podtato::metrics::metrics;
use serde_json::json;
use std::time::Duration;

fn client() -> PeerClient {
    PeerClient::new(&PeerTimeouts {
        connect_timeout: Duration::from_millis(250),
        request_timeout: Duration::from_millis(500),
    })
    .expect("peer client")
}

/// Locator that cannot resolve anything.
struct Unreachable;

impl ServiceLocator for Unreachable {
    fn resolve(&self, service: &str) -> Result<String, LocatorError> {
        Err(LocatorError::ResolutionFailed {
            service: service.to_string(),
        })
    }

    fn strategy(&self) -> &'static str {
        "unreachable"
    }
}

#[tokio::test]
async fn decodes_a_well_formed_part() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/images/hat/hat");
            then.status(200).json_body(json!({
                "image": "images/hat/hat-02.svg",
                "servedBy": "hat-7d9f",
                "version": "v0.3.0"
            }));
        })
        .await;

    let locator = ExternalLocator::from_entries([("hat", server.base_url())]);
    let part = client().fetch(&locator, "hat").await;

    mock.assert_async().await;
    assert_eq!(
        part,
        PartResult {
            image: "images/hat/hat-02.svg".to_string(),
            served_by: "hat-7d9f".to_string(),
            version: "v0.3.0".to_string(),
        }
    );
}

#[tokio::test]
async fn body_without_version_still_yields_image_and_host() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/images/left-leg/left-leg");
            then.status(200)
                .json_body(json!({ "image": "images/left-leg/left-leg-01.svg", "servedBy": "ll" }));
        })
        .await;

    let locator = ExternalLocator::from_entries([("left-leg", server.base_url())]);
    let part = client().fetch(&locator, "left-leg").await;
    assert_eq!(part.image, "images/left-leg/left-leg-01.svg");
    assert_eq!(part.served_by, "ll");
    assert!(part.version.is_empty());
}

#[tokio::test]
async fn non_json_body_degrades_at_decode() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/images/hat/hat");
            then.status(200).body("<html>definitely not json</html>");
        })
        .await;

    let locator = ExternalLocator::from_entries([("hat", server.base_url())]);
    let failure = client().try_fetch(&locator, "hat").await.unwrap_err();
    assert_eq!(failure.stage, FetchStage::Decode);
    assert!(failure.reason.contains("HTTP 200"));

    assert!(client().fetch(&locator, "hat").await.is_empty());
}

#[tokio::test]
async fn refused_connection_degrades_at_request() {
    let port = common::reserve_port().expect("reserve port");
    let locator = ExternalLocator::from_entries([("right-arm", format!("http://127.0.0.1:{port}"))]);

    let failure = client().try_fetch(&locator, "right-arm").await.unwrap_err();
    assert_eq!(failure.stage, FetchStage::Request);
    assert!(client().fetch(&locator, "right-arm").await.is_empty());
}

#[tokio::test]
async fn slow_peer_is_cut_off_by_the_request_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/images/hat/hat");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({ "image": "images/hat/hat-01.svg" }));
        })
        .await;

    let locator = ExternalLocator::from_entries([("hat", server.base_url())]);
    let started = std::time::Instant::now();
    let part = client().fetch(&locator, "hat").await;
    assert!(part.is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn unresolvable_names_degrade_at_resolve_and_are_counted() {
    let before = failures_for("left-arm", "resolve");

    let failure = client()
        .try_fetch(&Unreachable, "left-arm")
        .await
        .unwrap_err();
    assert_eq!(failure.stage, FetchStage::Resolve);

    assert!(client().fetch(&Unreachable, "left-arm").await.is_empty());
    assert!(failures_for("left-arm", "resolve") > before);
}

#[tokio::test]
async fn unreachable_locator_gives_empty_slots_for_every_part() {
    let slots = fan_out(&client(), &Unreachable).await;
    for part in BodyPart::ALL {
        assert!(slots.get(part).is_empty(), "{part} should be empty");
    }
    assert_eq!(slots.populated(), 0);
}

#[tokio::test]
async fn one_failing_peer_does_not_affect_the_others() {
    let server = MockServer::start_async().await;
    for part in ["left-arm", "right-arm", "left-leg", "right-leg"] {
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/images/{part}/{part}"));
                then.status(200).json_body(json!({
                    "image": format!("images/{part}/{part}-01.svg"),
                    "servedBy": "mock",
                    "version": "test"
                }));
            })
            .await;
    }

    let base = server.base_url();
    let locator = ExternalLocator::from_entries(
        ["left-arm", "right-arm", "left-leg", "right-leg"]
            .into_iter()
            .map(|part| (part, base.clone())),
    );
    let slots = fan_out(&client(), &locator).await;

    assert_eq!(slots.populated(), 4);
    assert!(slots.get(BodyPart::Hat).is_empty());
    assert_eq!(slots.get(BodyPart::LeftLeg).image, "images/left-leg/left-leg-01.svg");
}

fn failures_for(service: &str, stage: &str) -> u64 {
    metrics()
        .peer_fetch_snapshot()
        .into_iter()
        .find(|entry| entry.service == service)
        .and_then(|entry| {
            entry
                .failures_by_stage
                .into_iter()
                .find(|(candidate, _)| candidate == stage)
                .map(|(_, total)| total)
        })
        .unwrap_or(0)
}
