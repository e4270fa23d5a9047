#[path = "../common/mod.rs"]
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use podtato::app::PodtatoApp;
use podtato::config::PodtatoConfig;
use podtato::domain::Role;
use podtato::server::{RouteKind, RouteTable};
use serde_json::Value;
use tower::ServiceExt;

fn roles() -> [Role; 3] {
    [
        Role::Monolith,
        Role::Frontend,
        Role::Part("left-arm".to_string()),
    ]
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("router is infallible");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, body.to_vec())
}

fn app_for(component: &str) -> PodtatoApp {
    let port = common::reserve_port_block(5).expect("port block");
    PodtatoApp::initialise(common::settings(component, port)).expect("app")
}

#[test]
fn probes_are_installed_for_every_role() {
    for role in roles() {
        let table = RouteTable::for_role(&role);
        assert_eq!(table.path_of(RouteKind::Health), Some("/healthz"));
        assert_eq!(table.path_of(RouteKind::Readiness), Some("/readyz"));
        assert_eq!(table.path_of(RouteKind::Metrics), Some("/metrics"));
        assert_eq!(table.path_of(RouteKind::Assets), Some("/assets/*path"));
    }
}

#[test]
fn home_only_for_aggregators_and_part_route_never_for_frontend() {
    for role in roles() {
        let table = RouteTable::for_role(&role);
        assert_eq!(
            table.contains(RouteKind::Home),
            matches!(role, Role::Monolith | Role::Frontend),
            "home route for {role}"
        );
        assert_eq!(
            table.contains(RouteKind::Part),
            !matches!(role, Role::Frontend),
            "part route for {role}"
        );
    }

    assert_eq!(
        RouteTable::for_role(&Role::Monolith).path_of(RouteKind::Part),
        Some("/images/:service/:part")
    );
    assert_eq!(
        RouteTable::for_role(&Role::Part("hat".to_string())).path_of(RouteKind::Part),
        Some("/images/hat/:part")
    );
}

#[tokio::test]
async fn health_readiness_and_metrics_answer_identically_across_roles() {
    for component in ["all", "frontend", "hat"] {
        let app = app_for(component);
        let router = app.router();

        let (status, body) = get(&router, "/healthz").await;
        assert_eq!(status, StatusCode::OK, "{component} /healthz");
        let health: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(health["status"], "ok");

        let (status, body) = get(&router, "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let ready: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(ready["state"], "NOT_READY");

        app.readiness().mark_ready();
        let (status, body) = get(&router, "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        let ready: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(ready["state"], "READY");

        let (status, body) = get(&router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).expect("utf8");
        assert!(text.contains(&format!("role=\"{component}\"")), "{text}");
        assert!(text.contains("podtato_ready 1"));
    }
}

#[tokio::test]
async fn leaf_serves_only_its_own_part_prefix() {
    let app = app_for("hat");
    let router = app.router();

    let (status, body) = get(&router, "/images/hat/hat").await;
    assert_eq!(status, StatusCode::OK);
    let part: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(part["image"], "images/hat/hat-01.svg");
    assert!(!part["servedBy"].as_str().unwrap_or_default().is_empty());
    assert_eq!(part["version"], env!("CARGO_PKG_VERSION"));

    let (status, _) = get(&router, "/images/left-arm/left-arm").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&router, "/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn monolith_part_route_takes_the_part_from_the_second_segment() {
    let app = app_for("all");
    let (status, body) = get(&app.router(), "/images/hat/left-leg").await;
    assert_eq!(status, StatusCode::OK);
    let part: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(part["image"], "images/left-leg/left-leg-01.svg");
}

#[tokio::test]
async fn frontend_has_no_part_route() {
    let app = app_for("frontend");
    let (status, _) = get(&app.router(), "/images/hat/hat").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assets_are_served_with_their_content_type() {
    let app = app_for("frontend");
    let router = app.router();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/assets/images/hat/hat-01.svg")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "image/svg+xml"
    );

    let (status, _) = get(&router, "/assets/images/torso.svg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn route_metacharacters_in_a_leaf_role_are_a_config_error() {
    for component in ["ha*t", "hat:x", "h{a}t", "left/arm"] {
        let raw = PodtatoConfig {
            component: component.to_string(),
            ..PodtatoConfig::default()
        };
        let err = raw.validate().unwrap_err();
        assert!(
            matches!(err.root(), podtato::error::Error::Role(_)),
            "`{component}` should fail as a role error, got {err}"
        );
    }
}

#[tokio::test]
async fn dotted_leaf_role_keeps_a_fixed_first_segment() {
    let app = app_for("hat.v2");
    let router = app.router();

    let (status, _) = get(&router, "/images/hat.v2/hat").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&router, "/images/hatANYTHING/hat").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
