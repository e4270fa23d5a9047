use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Process-wide readiness cell: written false at construction, flipped true once, read by
/// any number of request handlers. Release on write and acquire on read give the
/// happens-before edge between the flip and every later probe.
#[derive(Clone, Debug, Default)]
pub struct ReadinessGate {
    ready: Arc<AtomicBool>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when this call performed the transition.
    pub fn mark_ready(&self) -> bool {
        !self.ready.swap(true, Ordering::AcqRel)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn state_label(&self) -> &'static str {
        if self.is_ready() {
            "READY"
        } else {
            "NOT_READY"
        }
    }
}

/// Blocks the startup path for the configured delay. Nothing is served meanwhile.
pub async fn hold_startup(delay: Option<Duration>) {
    if let Some(delay) = delay.filter(|delay| !delay.is_zero()) {
        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            "delaying startup before accepting connections"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Flips the gate on a separate task. Runs concurrently with listener start, so the readiness
/// probe may briefly answer not-ready while other routes already serve traffic.
pub fn spawn_mark_ready(gate: &ReadinessGate) -> tokio::task::JoinHandle<()> {
    let gate = gate.clone();
    tokio::spawn(async move {
        if gate.mark_ready() {
            tracing::info!("podtato-head is ready");
        }
    })
}
