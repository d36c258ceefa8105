//! Editgate scoring service entrypoint.

use std::net::SocketAddr;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use editgate::broker::RequestBroker;
use editgate::config::{Config, DEFAULT_PORT};
use editgate::gateway::{HandlerState, create_router_with_state};
use editgate::oracle::{BatchScorer, RemoteBatchScorer};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        score_min = config.score_min,
        score_max = config.score_max,
        "Editgate starting"
    );

    let scorer = build_scorer(&config)?;
    let broker = RequestBroker::spawn(scorer, config.broker_config());
    let app = create_router_with_state(HandlerState::new(broker));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Editgate shutdown complete");
    Ok(())
}

#[cfg(feature = "mock")]
fn build_scorer(config: &Config) -> anyhow::Result<Box<dyn BatchScorer>> {
    if config.mock_oracle {
        tracing::warn!("EDITGATE_MOCK_ORACLE set, serving scores from the mock scorer");
        return Ok(Box::new(editgate::oracle::MockBatchScorer::default()));
    }
    remote_scorer(config)
}

#[cfg(not(feature = "mock"))]
fn build_scorer(config: &Config) -> anyhow::Result<Box<dyn BatchScorer>> {
    if config.mock_oracle {
        tracing::warn!("EDITGATE_MOCK_ORACLE ignored: built without the `mock` feature");
    }
    remote_scorer(config)
}

fn remote_scorer(config: &Config) -> anyhow::Result<Box<dyn BatchScorer>> {
    let url = config.oracle_url()?;
    tracing::info!(oracle_url = url, "Using remote scorer");
    let scorer = RemoteBatchScorer::new(url, config.oracle_key.clone(), config.oracle_timeout)?;
    Ok(Box::new(scorer))
}

fn run_health_check() -> i32 {
    let port = std::env::var("EDITGATE_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return 1;
    };

    rt.block_on(async {
        let Ok(client) = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
        else {
            return 1;
        };

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
