//! Root route logic for the aggregating roles.

use crate::discovery::{LocatorStrategy, ServiceLocator};
use crate::domain::{AggregatedView, BodyPart, Daytime, PartSlots};
use crate::error::{Context, Result};
use crate::fetcher::{FetchStage, PeerClient};
use crate::metrics::metrics;
use crate::peer_event;
use chrono::Timelike;

/// Source of the name reported as `hostname` / `servedBy`. Failure is fatal to the caller.
pub type HostnameLookup = fn() -> Result<String>;

/// Local identity facts shown on the home page next to the peer parts.
#[derive(Clone, Debug)]
pub struct Identity {
    pub version: String,
    pub secret_message: String,
    pub hostname: HostnameLookup,
}

pub struct Aggregator {
    strategy: LocatorStrategy,
    client: PeerClient,
    identity: Identity,
}

impl Aggregator {
    /// Fails when the strategy can never produce a locator, e.g. a local port too close to
    /// 65535 for the peer offsets.
    pub fn new(strategy: LocatorStrategy, client: PeerClient, identity: Identity) -> Result<Self> {
        if matches!(strategy, LocatorStrategy::Local { .. }) {
            strategy
                .materialise()
                .context("invalid local service locator")?;
        }
        tracing::info!(locator = strategy.label(), "aggregator configured");
        Ok(Self {
            strategy,
            client,
            identity,
        })
    }

    pub fn strategy(&self) -> &LocatorStrategy {
        &self.strategy
    }

    /// Builds a fresh view. Only an unreadable own hostname is an error; peer problems
    /// leave their slot empty.
    pub async fn collect(&self) -> Result<AggregatedView> {
        let hostname = (self.identity.hostname)()?;
        let parts = self.collect_parts().await;
        tracing::debug!(populated = parts.populated(), "aggregation pass complete");

        Ok(AggregatedView {
            hostname,
            version: self.identity.version.clone(),
            daytime: Daytime::from_hour(chrono::Local::now().hour()),
            secret_message: self.identity.secret_message.clone(),
            parts,
        })
    }

    pub async fn collect_parts(&self) -> PartSlots {
        match self.strategy.materialise() {
            Ok(locator) => fan_out(&self.client, locator.as_ref()).await,
            Err(err) => {
                for part in BodyPart::ALL {
                    metrics().record_peer_failure(part.as_str(), FetchStage::Resolve.as_str());
                    peer_event!(
                        warn,
                        "service locator unavailable; rendering without part",
                        service = part.as_str(),
                        stage = FetchStage::Resolve.as_str(),
                        error = err
                    );
                }
                PartSlots::default()
            }
        }
    }
}

/// One fetch per body part, run concurrently against a shared locator.
pub async fn fan_out(client: &PeerClient, locator: &dyn ServiceLocator) -> PartSlots {
    let (left_arm, right_arm, left_leg, right_leg, hat) = tokio::join!(
        client.fetch(locator, BodyPart::LeftArm.as_str()),
        client.fetch(locator, BodyPart::RightArm.as_str()),
        client.fetch(locator, BodyPart::LeftLeg.as_str()),
        client.fetch(locator, BodyPart::RightLeg.as_str()),
        client.fetch(locator, BodyPart::Hat.as_str()),
    );
    PartSlots {
        left_arm,
        right_arm,
        left_leg,
        right_leg,
        hat,
    }
}

pub fn own_hostname() -> Result<String> {
    let raw = hostname::get().context("unable to determine own hostname")?;
    let name = raw.to_string_lossy();
    let name = name.trim();
    if name.is_empty() {
        return Err(crate::err!("own hostname is empty"));
    }
    Ok(name.to_string())
}
