#![allow(clippy::result_large_err)]

pub mod aggregate;
pub mod app;
pub mod app_state;
pub mod assets;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod metrics;
pub mod readiness;
pub mod render;
pub mod server;
pub mod telemetry;
