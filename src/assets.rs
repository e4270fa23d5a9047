//! Static files compiled into the binary and served under `/assets`.

use axum::body::Body;
use axum::extract::Path;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub const ASSETS_PREFIX: &str = "/assets";
pub const HOME_TEMPLATE_PATH: &str = "html/podtato-home.html";

static BUNDLE: &[(&str, &[u8])] = &[
    (
        "html/podtato-home.html",
        include_bytes!("../assets/html/podtato-home.html"),
    ),
    ("css/styles.css", include_bytes!("../assets/css/styles.css")),
    (
        "images/body/body.svg",
        include_bytes!("../assets/images/body/body.svg"),
    ),
    (
        "images/hat/hat-01.svg",
        include_bytes!("../assets/images/hat/hat-01.svg"),
    ),
    (
        "images/left-arm/left-arm-01.svg",
        include_bytes!("../assets/images/left-arm/left-arm-01.svg"),
    ),
    (
        "images/right-arm/right-arm-01.svg",
        include_bytes!("../assets/images/right-arm/right-arm-01.svg"),
    ),
    (
        "images/left-leg/left-leg-01.svg",
        include_bytes!("../assets/images/left-leg/left-leg-01.svg"),
    ),
    (
        "images/right-leg/right-leg-01.svg",
        include_bytes!("../assets/images/right-leg/right-leg-01.svg"),
    ),
];

/// Path is relative to the bundle root, i.e. with `/assets/` already stripped.
pub fn lookup(path: &str) -> Option<&'static [u8]> {
    let path = path.trim_start_matches('/');
    BUNDLE
        .iter()
        .find(|(name, _)| *name == path)
        .map(|(_, bytes)| *bytes)
}

pub fn home_template_source() -> Option<&'static str> {
    lookup(HOME_TEMPLATE_PATH).and_then(|bytes| std::str::from_utf8(bytes).ok())
}

pub fn content_type_for(path: &str) -> &'static str {
    let extension = path.rsplit('.').next().unwrap_or_default();
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "ico" => "image/x-icon",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

pub async fn serve_asset(Path(path): Path<String>) -> Response {
    match lookup(&path) {
        Some(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type_for(&path))
            .header(CACHE_CONTROL, "public, max-age=300")
            .body(Body::from(bytes))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
