use crate::aggregate::{Aggregator, HostnameLookup};
use crate::config::Settings;
use crate::error::Error;
use crate::readiness::ReadinessGate;
use crate::render::HomeTemplate;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub readiness: ReadinessGate,
    pub template: Arc<HomeTemplate>,
    /// Present for `all` and `frontend` only.
    pub aggregator: Option<Arc<Aggregator>>,
    pub fatal: FatalReporter,
    pub hostname: HostnameLookup,
}

/// Sending half of the channel on which handlers report process-terminating errors.
#[derive(Clone, Debug)]
pub struct FatalReporter {
    sender: mpsc::UnboundedSender<Error>,
}

pub type FatalReceiver = mpsc::UnboundedReceiver<Error>;

impl FatalReporter {
    pub fn channel() -> (Self, FatalReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn report(&self, error: Error) {
        tracing::error!(
            error = %error.chain(),
            cause = %error.root(),
            "fatal error while serving request"
        );
        if self.sender.send(error).is_err() {
            tracing::warn!("fatal error channel closed; runtime already stopping");
        }
    }
}
