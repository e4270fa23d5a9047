#![allow(dead_code)]

use podtato::app::PodtatoApp;
use podtato::config::{PodtatoConfig, Settings};
use podtato::readiness::ReadinessGate;
use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub fn reserve_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

/// A port `p` such that `p..=p + width` were all free when probed.
pub fn reserve_port_block(width: u16) -> std::io::Result<u16> {
    for _ in 0..64 {
        let base = reserve_port()?;
        if base.checked_add(width).is_none() {
            continue;
        }
        let free = (1..=width).all(|offset| TcpListener::bind(("127.0.0.1", base + offset)).is_ok());
        if free {
            return Ok(base);
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::AddrInUse,
        "no free port block found",
    ))
}

pub fn settings(component: &str, port: u16) -> Settings {
    let mut raw = PodtatoConfig {
        component: component.to_string(),
        port,
        bind_host: "127.0.0.1".to_string(),
        secret_message: "hello from the tests".to_string(),
        ..PodtatoConfig::default()
    };
    raw.discovery.local_host = "127.0.0.1".to_string();
    raw.peer.connect_timeout = "250ms".to_string();
    raw.peer.request_timeout = "1s".to_string();
    raw.validate().expect("test settings validate")
}

/// Unique scratch file path under the system temp dir.
pub fn scratch_path(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir().join(format!(
        "podtato-{label}-{}-{nanos}.yaml",
        std::process::id()
    ))
}

pub struct RunningApp {
    pub base_url: String,
    pub readiness: ReadinessGate,
    pub shutdown: CancellationToken,
    pub task: JoinHandle<podtato::error::Result<()>>,
}

impl RunningApp {
    pub async fn stop(self) -> podtato::error::Result<()> {
        self.shutdown.cancel();
        self.task.await.expect("app task join")
    }
}

/// Starts the full runtime and waits until `/healthz` answers.
pub async fn start_app(settings: Settings) -> RunningApp {
    let base_url = format!("http://127.0.0.1:{}", settings.port);
    let app = PodtatoApp::initialise(settings).expect("app initialises");
    let readiness = app.readiness();
    let shutdown = app.shutdown_token();
    let task = tokio::spawn(app.run());

    wait_until_serving(&base_url, Duration::from_secs(5)).await;

    RunningApp {
        base_url,
        readiness,
        shutdown,
        task,
    }
}

pub async fn wait_until_serving(base_url: &str, limit: Duration) {
    let client = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if let Ok(response) = client.get(format!("{base_url}/healthz")).send().await {
            if response.status().is_success() {
                return;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "{base_url} never started serving"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
