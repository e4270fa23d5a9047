use crate::aggregate::Aggregator;
use crate::app_state::AppState;
use crate::assets::{serve_asset, ASSETS_PREFIX};
use crate::domain::{PartResult, Role};
use crate::error::{Context, Result};
use crate::metrics::{render_exposition, track_http, ExpositionContext};
use axum::extract::Path;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::collections::HashMap;
use tower::ServiceBuilder;

pub const ROOT_PATH: &str = "/";
pub const HEALTH_PATH: &str = "/healthz";
pub const READINESS_PATH: &str = "/readyz";
pub const METRICS_PATH: &str = "/metrics";
pub const MONOLITH_PART_PATH: &str = "/images/:service/:part";

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteKind {
    Health,
    Readiness,
    Metrics,
    Home,
    Assets,
    Part,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSpec {
    pub kind: RouteKind,
    pub path: String,
}

impl RouteSpec {
    fn new(kind: RouteKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Routes exposed for one role. Decided once at startup and never changed.
#[derive(Clone, Debug)]
pub struct RouteTable {
    role: Role,
    routes: Vec<RouteSpec>,
}

impl RouteTable {
    pub fn for_role(role: &Role) -> Self {
        let mut routes = vec![
            RouteSpec::new(RouteKind::Health, HEALTH_PATH),
            RouteSpec::new(RouteKind::Readiness, READINESS_PATH),
            RouteSpec::new(RouteKind::Metrics, METRICS_PATH),
        ];

        match role {
            Role::Monolith => {
                routes.push(RouteSpec::new(RouteKind::Home, ROOT_PATH));
                routes.push(RouteSpec::new(RouteKind::Assets, assets_path()));
                routes.push(RouteSpec::new(RouteKind::Part, MONOLITH_PART_PATH));
            }
            Role::Frontend => {
                routes.push(RouteSpec::new(RouteKind::Home, ROOT_PATH));
                routes.push(RouteSpec::new(RouteKind::Assets, assets_path()));
            }
            Role::Part(name) => {
                routes.push(RouteSpec::new(RouteKind::Assets, assets_path()));
                routes.push(RouteSpec::new(
                    RouteKind::Part,
                    format!("/images/{name}/:part"),
                ));
            }
        }

        Self {
            role: role.clone(),
            routes,
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }

    pub fn contains(&self, kind: RouteKind) -> bool {
        self.routes.iter().any(|route| route.kind == kind)
    }

    pub fn path_of(&self, kind: RouteKind) -> Option<&str> {
        self.routes
            .iter()
            .find(|route| route.kind == kind)
            .map(|route| route.path.as_str())
    }

    pub fn into_router(self, state: AppState) -> Router {
        let mut router = Router::new();
        for route in &self.routes {
            let path = route.path.as_str();
            router = match route.kind {
                RouteKind::Health => router.route(path, get(healthz)),
                RouteKind::Readiness => router.route(path, get(readyz)),
                RouteKind::Metrics => router.route(path, get(metrics_endpoint)),
                RouteKind::Home => router.route(path, get(home)),
                RouteKind::Assets => router.route(path, get(serve_asset)),
                RouteKind::Part => router.route(path, get(part)),
            };
        }

        router.layer(
            ServiceBuilder::new()
                .layer(Extension(state))
                .layer(middleware::from_fn(track_http)),
        )
    }
}

fn assets_path() -> String {
    format!("{ASSETS_PREFIX}/*path")
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

async fn readyz(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let status = if state.readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "state": state.readiness.state_label() })))
}

async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let body = render_exposition(&ExpositionContext {
        role: state.settings.role.as_str(),
        version: &state.settings.service_version,
        ready: state.readiness.is_ready(),
    });
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body)
}

async fn home(Extension(state): Extension<AppState>) -> Response {
    let Some(aggregator) = state.aggregator.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match render_home(&state, &aggregator).await {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            state.fatal.report(err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn render_home(state: &AppState, aggregator: &Aggregator) -> Result<String> {
    let view = aggregator
        .collect()
        .await
        .context("failed to assemble home page view")?;
    state
        .template
        .render(&view)
        .context("failed to render home page")
}

async fn part(
    Extension(state): Extension<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Response {
    let Some(part) = params.get("part") else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let served_by = match (state.hostname)() {
        Ok(hostname) => hostname,
        Err(err) => {
            state.fatal.report(err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let variant = &state.settings.part_variant;
    Json(PartResult {
        image: format!("images/{part}/{part}-{variant}.svg"),
        served_by,
        version: state.settings.service_version.clone(),
    })
    .into_response()
}
