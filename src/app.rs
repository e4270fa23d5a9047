use crate::aggregate::{own_hostname, Aggregator, HostnameLookup, Identity};
use crate::app_state::{AppState, FatalReceiver, FatalReporter};
use crate::assets::home_template_source;
use crate::config::Settings;
use crate::discovery::LocatorStrategy;
use crate::error::{Context, Error, Result};
use crate::fetcher::PeerClient;
use crate::readiness::{hold_startup, spawn_mark_ready, ReadinessGate};
use crate::render::HomeTemplate;
use crate::server::RouteTable;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PodtatoApp {
    state: AppState,
    routes: RouteTable,
    fatal: FatalReceiver,
    shutdown: CancellationToken,
}

impl PodtatoApp {
    /// Everything that can fail before the listener opens fails here.
    pub fn initialise(settings: Settings) -> Result<Self> {
        Self::initialise_with_hostname(settings, own_hostname)
    }

    /// As [`PodtatoApp::initialise`], with the own-hostname source supplied by the caller.
    pub fn initialise_with_hostname(settings: Settings, hostname: HostnameLookup) -> Result<Self> {
        let source = home_template_source().ok_or_else(|| crate::err!("home template missing"))?;
        let template = HomeTemplate::parse(source).context("failed to parse home template")?;

        let aggregator = if settings.role.is_aggregator() {
            let strategy =
                LocatorStrategy::for_role(&settings.role, settings.port, &settings.discovery);
            let client = PeerClient::new(&settings.peer)?;
            let identity = Identity {
                version: settings.service_version.clone(),
                secret_message: settings.secret_message.clone(),
                hostname,
            };
            Some(Arc::new(Aggregator::new(strategy, client, identity)?))
        } else {
            None
        };

        let routes = RouteTable::for_role(&settings.role);
        let (reporter, fatal) = FatalReporter::channel();

        Ok(Self {
            state: AppState {
                settings: Arc::new(settings),
                readiness: ReadinessGate::new(),
                template: Arc::new(template),
                aggregator,
                fatal: reporter,
                hostname,
            },
            routes,
            fatal,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn readiness(&self) -> ReadinessGate {
        self.state.readiness.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn router(&self) -> Router {
        self.routes.clone().into_router(self.state.clone())
    }

    /// Cancelling the token stops the listener as Ctrl+C would.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(mut self) -> Result<()> {
        let settings = Arc::clone(&self.state.settings);
        let addr = settings.listen_addr();
        tracing::info!(
            component = %settings.role,
            mode = settings.role.mode_label(),
            port = settings.port,
            version = %settings.service_version,
            "starting podtato-head"
        );

        hold_startup(settings.startup_delay).await;

        let router = self.router();
        let readiness_task = spawn_mark_ready(&self.state.readiness);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))?;
        tracing::info!("podtato-head listening on {addr}");

        let server_shutdown = self.shutdown.clone();
        let mut server: JoinHandle<Result<()>> = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    server_shutdown.cancelled().await;
                })
                .await
                .context("http server exited abnormally")
        });

        let (outcome, server_finished) = tokio::select! {
            res = &mut server => {
                tracing::warn!("http server task terminated unexpectedly");
                (flatten_join(res), true)
            }
            Some(err) = self.fatal.recv() => {
                (Err(Error::with_context("request handling hit a fatal error", err)), false)
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                (Ok(()), false)
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("shutdown requested");
                (Ok(()), false)
            }
        };

        self.shutdown.cancel();
        if !server_finished {
            match timeout(DRAIN_TIMEOUT, &mut server).await {
                Ok(res) => {
                    if let Err(err) = flatten_join(res) {
                        tracing::warn!(error = %err, "http server stopped with error");
                    }
                }
                Err(_) => {
                    tracing::error!(
                        timeout_secs = DRAIN_TIMEOUT.as_secs_f64(),
                        "http server did not drain in time; aborting"
                    );
                    server.abort();
                }
            }
        }

        if let Err(err) = readiness_task.await {
            tracing::warn!(error = %err, "readiness task did not complete");
        }

        outcome
    }
}

fn flatten_join(res: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match res {
        Ok(inner) => inner,
        Err(join_err) => Err(crate::err!("http server task join error: {join_err}")),
    }
}
