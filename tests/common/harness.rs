//! Test server harness.

use std::net::SocketAddr;

use editgate::broker::{BrokerConfig, RequestBroker};
use editgate::gateway::{HandlerState, create_router_with_state};
use editgate::oracle::MockBatchScorer;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub addr: SocketAddr,
    pub broker: RequestBroker,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Serves the full router on an ephemeral port, backed by `scorer`.
pub async fn spawn_test_server(
    scorer: MockBatchScorer,
    config: BrokerConfig,
) -> std::io::Result<TestServer> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;

    let broker = RequestBroker::spawn(Box::new(scorer), config);
    let app = create_router_with_state(HandlerState::new(broker.clone()));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    Ok(TestServer {
        addr,
        broker,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
