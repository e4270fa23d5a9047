//! Resolution of logical peer names to reachable base URLs.
//!
//! Two strategies exist. [`LocalLocator`] synthesises addresses from the process's own port
//! and is only used by the monolith role. [`ExternalLocator`] reads addresses from a services
//! file or from Kubernetes service environment variables.

pub mod external;
pub mod local;

pub use external::{DiscoverySettings, ExternalLocator};
pub use local::LocalLocator;

use crate::domain::Role;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("unknown service `{service}`")]
    UnknownService { service: String },
    #[error("no address configured for service `{service}`")]
    ResolutionFailed { service: String },
    #[error("service directory `{path}` unavailable: {reason}")]
    DirectoryUnavailable { path: PathBuf, reason: String },
    #[error("local port {port} leaves no room for peer offset {offset}")]
    PortOverflow { port: u16, offset: u16 },
}

pub trait ServiceLocator: Send + Sync {
    fn resolve(&self, service: &str) -> Result<String, LocatorError>;

    fn strategy(&self) -> &'static str;
}

/// Strategy picked once per aggregator. [`LocatorStrategy::materialise`] produces a fresh
/// locator for every aggregation pass.
#[derive(Clone, Debug)]
pub enum LocatorStrategy {
    Local { host: String, port: u16 },
    External(DiscoverySettings),
}

impl LocatorStrategy {
    pub fn for_role(role: &Role, port: u16, settings: &DiscoverySettings) -> Self {
        match role {
            Role::Monolith => LocatorStrategy::Local {
                host: settings.local_host.clone(),
                port,
            },
            _ => LocatorStrategy::External(settings.clone()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LocatorStrategy::Local { .. } => local::STRATEGY,
            LocatorStrategy::External(_) => external::STRATEGY,
        }
    }

    pub fn materialise(&self) -> Result<Box<dyn ServiceLocator>, LocatorError> {
        match self {
            LocatorStrategy::Local { host, port } => {
                Ok(Box::new(LocalLocator::new(host.clone(), *port)?))
            }
            LocatorStrategy::External(settings) => Ok(Box::new(ExternalLocator::discover(settings)?)),
        }
    }
}

pub(crate) fn trim_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
