use super::{trim_base_url, LocatorError, ServiceLocator};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub(crate) const STRATEGY: &str = "external";

const ENV_SERVICE_PREFIX: &str = "PODTATO_HEAD_";
const ENV_HOST_SUFFIX: &str = "_SERVICE_HOST";
const ENV_PORT_SUFFIX: &str = "_SERVICE_PORT";

#[derive(Clone, Debug, Deserialize)]
pub struct DiscoverySettings {
    #[serde(default = "default_local_host")]
    pub local_host: String,
    #[serde(default)]
    pub services_file: Option<PathBuf>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            local_host: default_local_host(),
            services_file: None,
        }
    }
}

fn default_local_host() -> String {
    "localhost".to_string()
}

/// Addresses read from configuration outside this process. Entries from a services file
/// win over the environment; names missing from the file fall back to it.
#[derive(Clone)]
pub struct ExternalLocator {
    entries: BTreeMap<String, String>,
    env: Option<EnvLookup>,
}

pub type EnvLookup = fn(&str) -> Option<String>;

impl std::fmt::Debug for ExternalLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalLocator")
            .field("entries", &self.entries)
            .field("env", &self.env.is_some())
            .finish()
    }
}

impl ExternalLocator {
    pub fn discover(settings: &DiscoverySettings) -> Result<Self, LocatorError> {
        Self::discover_with(settings, process_env)
    }

    pub fn discover_with(
        settings: &DiscoverySettings,
        lookup: EnvLookup,
    ) -> Result<Self, LocatorError> {
        let entries = match settings.services_file.as_ref() {
            Some(path) => read_services_file(path)?,
            None => BTreeMap::new(),
        };
        Ok(Self::from_entries(entries).with_env(lookup))
    }

    /// Locator over a fixed table only.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, url)| (name.into(), trim_base_url(url.as_ref())))
            .filter(|(_, url)| !url.is_empty())
            .collect();
        Self { entries, env: None }
    }

    pub fn from_env_with(lookup: EnvLookup) -> Self {
        Self {
            entries: BTreeMap::new(),
            env: Some(lookup),
        }
    }

    pub fn with_env(mut self, lookup: EnvLookup) -> Self {
        self.env = Some(lookup);
        self
    }
}

impl ServiceLocator for ExternalLocator {
    fn resolve(&self, service: &str) -> Result<String, LocatorError> {
        self.entries
            .get(service)
            .cloned()
            .or_else(|| {
                self.env
                    .and_then(|lookup| resolve_from_env(service, lookup))
            })
            .ok_or_else(|| LocatorError::ResolutionFailed {
                service: service.to_string(),
            })
    }

    fn strategy(&self) -> &'static str {
        STRATEGY
    }
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn read_services_file(path: &Path) -> Result<BTreeMap<String, String>, LocatorError> {
    let unavailable = |reason: String| LocatorError::DirectoryUnavailable {
        path: path.to_path_buf(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|err| unavailable(err.to_string()))?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_yaml::from_str(&raw).map_err(|err| unavailable(err.to_string()))
}

/// Kubernetes service variables, e.g. `PODTATO_HEAD_LEFT_ARM_SERVICE_HOST`.
pub fn env_keys(service: &str) -> (String, String) {
    let stem = service.to_ascii_uppercase().replace(['-', '.'], "_");
    (
        format!("{ENV_SERVICE_PREFIX}{stem}{ENV_HOST_SUFFIX}"),
        format!("{ENV_SERVICE_PREFIX}{stem}{ENV_PORT_SUFFIX}"),
    )
}

fn resolve_from_env(service: &str, lookup: EnvLookup) -> Option<String> {
    let (host_key, port_key) = env_keys(service);
    let host = lookup(&host_key).filter(|value| !value.trim().is_empty())?;
    let port = lookup(&port_key).filter(|value| !value.trim().is_empty())?;
    Some(trim_base_url(&format!("http://{}:{}", host.trim(), port.trim())))
}
