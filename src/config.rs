use crate::discovery::DiscoverySettings;
use crate::domain::Role;
use crate::error::{Context, Result};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_PART_VARIANT: &str = "01";
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_CONNECT_TIMEOUT: &str = "1s";
const DEFAULT_REQUEST_TIMEOUT: &str = "3s";

/// Raw configuration as read from `config/local` and `PODTATO_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct PodtatoConfig {
    #[serde(default = "default_component")]
    pub component: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub startup_delay: Option<String>,
    #[serde(default)]
    pub secret_message: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default = "default_part_variant")]
    pub part_variant: String,
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default)]
    pub peer: PeerConfig,
    #[serde(default)]
    pub discovery: DiscoverySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for PodtatoConfig {
    fn default() -> Self {
        Self {
            component: default_component(),
            port: default_port(),
            startup_delay: None,
            secret_message: String::new(),
            service_version: default_service_version(),
            part_variant: default_part_variant(),
            bind_host: default_bind_host(),
            peer: PeerConfig::default(),
            discovery: DiscoverySettings::default(),
        }
    }
}

fn default_component() -> String {
    crate::domain::MONOLITH_ROLE.to_string()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_part_variant() -> String {
    DEFAULT_PART_VARIANT.to_string()
}

fn default_bind_host() -> String {
    DEFAULT_BIND_HOST.to_string()
}

fn default_connect_timeout() -> String {
    DEFAULT_CONNECT_TIMEOUT.to_string()
}

fn default_request_timeout() -> String {
    DEFAULT_REQUEST_TIMEOUT.to_string()
}

/// Values given on the command line. They win over file and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub component: Option<String>,
    pub port: Option<u16>,
}

impl PodtatoConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("PODTATO")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(component) = overrides.component {
            self.component = component;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
    }

    /// Turns raw strings into typed values. Every failure here is fatal at startup.
    pub fn validate(self) -> Result<Settings> {
        let role: Role = self
            .component
            .parse()
            .with_context(|| format!("invalid component `{}`", self.component))?;

        let startup_delay = match self.startup_delay.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                humantime::parse_duration(raw)
                    .with_context(|| format!("invalid startup_delay `{raw}`"))?,
            ),
        };

        let peer = PeerTimeouts {
            connect_timeout: parse_timeout("peer.connect_timeout", &self.peer.connect_timeout)?,
            request_timeout: parse_timeout("peer.request_timeout", &self.peer.request_timeout)?,
        };

        let bind_host: IpAddr = self
            .bind_host
            .trim()
            .parse()
            .with_context(|| format!("invalid bind_host `{}`", self.bind_host))?;

        Ok(Settings {
            role,
            port: self.port,
            bind_host,
            startup_delay,
            secret_message: self.secret_message,
            service_version: self.service_version,
            part_variant: self.part_variant,
            peer,
            discovery: self.discovery,
        })
    }
}

fn parse_timeout(key: &str, raw: &str) -> Result<Duration> {
    let parsed = humantime::parse_duration(raw.trim())
        .with_context(|| format!("invalid {key} `{raw}`"))?;
    if parsed.is_zero() {
        return Err(crate::err!("{key} must be greater than zero"));
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerTimeouts {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for PeerTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(3),
        }
    }
}

/// Validated process configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub role: Role,
    pub port: u16,
    pub bind_host: IpAddr,
    pub startup_delay: Option<Duration>,
    pub secret_message: String,
    pub service_version: String,
    pub part_variant: String,
    pub peer: PeerTimeouts,
    pub discovery: DiscoverySettings,
}

impl Settings {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.port)
    }
}
