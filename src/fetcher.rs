use crate::config::PeerTimeouts;
use crate::discovery::ServiceLocator;
use crate::domain::PartResult;
use crate::error::{Context, Result};
use crate::metrics::metrics;
use crate::peer_event;
use reqwest::{Client, ClientBuilder};
use std::fmt;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchStage {
    Resolve,
    Request,
    Read,
    Decode,
}

impl FetchStage {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchStage::Resolve => "resolve",
            FetchStage::Request => "request",
            FetchStage::Read => "read",
            FetchStage::Decode => "decode",
        }
    }
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub stage: FetchStage,
    pub reason: String,
}

impl FetchFailure {
    fn new(stage: FetchStage, reason: impl fmt::Display) -> Self {
        Self {
            stage,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.reason)
    }
}

/// HTTP client for peer part services. Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct PeerClient {
    http: Client,
}

impl PeerClient {
    pub fn new(timeouts: &PeerTimeouts) -> Result<Self> {
        let http = ClientBuilder::new()
            .connect_timeout(timeouts.connect_timeout)
            .timeout(timeouts.request_timeout)
            .build()
            .context("failed to build peer HTTP client")?;
        Ok(Self { http })
    }

    /// Never fails. Any stage that goes wrong is logged, counted and turned into the
    /// empty result.
    pub async fn fetch(&self, locator: &dyn ServiceLocator, service: &str) -> PartResult {
        match self.try_fetch(locator, service).await {
            Ok(part) => {
                metrics().record_peer_success(service);
                peer_event!(
                    debug,
                    "peer part fetched",
                    service = service,
                    image = part.image
                );
                part
            }
            Err(failure) => {
                metrics().record_peer_failure(service, failure.stage.as_str());
                peer_event!(
                    warn,
                    "peer part unavailable; rendering without it",
                    service = service,
                    stage = failure.stage.as_str(),
                    locator = locator.strategy(),
                    error = failure.reason
                );
                PartResult::empty()
            }
        }
    }

    pub async fn try_fetch(
        &self,
        locator: &dyn ServiceLocator,
        service: &str,
    ) -> Result<PartResult, FetchFailure> {
        let base = locator
            .resolve(service)
            .map_err(|err| FetchFailure::new(FetchStage::Resolve, err))?;
        let url = part_url(&base, service)
            .map_err(|err| FetchFailure::new(FetchStage::Resolve, err))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchFailure::new(FetchStage::Request, err))?;
        let status = response.status();

        // bytes() consumes the response, so the connection is released on both arms
        let body = response
            .bytes()
            .await
            .map_err(|err| FetchFailure::new(FetchStage::Read, err))?;

        serde_json::from_slice::<PartResult>(&body).map_err(|err| {
            FetchFailure::new(FetchStage::Decode, format!("{err} (HTTP {status})"))
        })
    }
}

/// `<base>/images/<service>/<service>`
pub fn part_url(base: &str, service: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/images/{service}/{service}",
        base.trim_end_matches('/')
    ))
}
