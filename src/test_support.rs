//! In-process stand-in for an IO-Link master used by the unit tests.
//!
//! An `axum` server on a loopback port serves the reachability probe
//! (`GET /`) and answers every JSON request (`POST /`) with whatever the
//! handler returns for the request's `adr`. It runs on its own tokio runtime
//! thread so the blocking client can be tested from plain `#[test]`s.

use crate::sync_client::GatewayConfig;
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::Value;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

type Handler = dyn Fn(&str) -> StubResponse + Send + Sync;

#[derive(Debug, Clone)]
pub(crate) struct StubResponse {
    status: u16,
    body: String,
    delay: Duration,
}

impl StubResponse {
    pub(crate) fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    /// A successful envelope with a nested `value`.
    pub(crate) fn envelope(value: &str) -> Self {
        Self::ok(serde_json::json!({"cid": 1, "code": 200, "data": {"value": value}}).to_string())
    }

    pub(crate) fn delayed(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }
}

#[derive(Clone)]
struct StubState {
    handler: Arc<Handler>,
    probe_status: StatusCode,
    requests: Arc<Mutex<Vec<Value>>>,
    probes: Arc<AtomicUsize>,
}

async fn probe(State(state): State<StubState>) -> impl IntoResponse {
    state.probes.fetch_add(1, Ordering::SeqCst);
    (state.probe_status, "<html><title>AL1350</title></html>")
}

async fn request(
    State(state): State<StubState>,
    Json(request): Json<Value>,
) -> impl IntoResponse {
    let address = request["adr"].as_str().unwrap_or_default().to_string();
    state.requests.lock().unwrap().push(request);
    let response = (state.handler)(&address);
    tokio::time::sleep(response.delay).await;
    (
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        response.body,
    )
}

pub(crate) struct StubGateway {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
    probes: Arc<AtomicUsize>,
}

impl StubGateway {
    pub(crate) fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> StubResponse + Send + Sync + 'static,
    {
        Self::start_with_probe(200, handler)
    }

    pub(crate) fn start_with_probe<F>(probe_status: u16, handler: F) -> Self
    where
        F: Fn(&str) -> StubResponse + Send + Sync + 'static,
    {
        // Bound before the thread starts, so the port accepts connections on return.
        let listener = TcpListener::bind("127.0.0.1:0").expect("Cannot bind stub gateway");
        listener
            .set_nonblocking(true)
            .expect("Cannot configure stub gateway socket");
        let addr = listener.local_addr().expect("Stub gateway has no address");

        let state = StubState {
            handler: Arc::new(handler),
            probe_status: StatusCode::from_u16(probe_status).expect("Invalid probe status"),
            requests: Arc::new(Mutex::new(Vec::new())),
            probes: Arc::new(AtomicUsize::new(0)),
        };
        let (requests, probes) = (state.requests.clone(), state.probes.clone());
        let app = Router::new()
            .route("/", get(probe).post(request))
            .with_state(state);

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Cannot build stub gateway runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener)
                    .expect("Cannot hand stub gateway socket to tokio");
                axum::serve(listener, app)
                    .await
                    .expect("Stub gateway stopped");
            });
        });

        Self {
            addr,
            requests,
            probes,
        }
    }

    pub(crate) fn host(&self) -> String {
        self.addr.to_string()
    }

    pub(crate) fn config(&self) -> GatewayConfig {
        GatewayConfig {
            timeout: Duration::from_secs(5),
            ..GatewayConfig::new(self.host())
        }
    }

    /// Bodies of all JSON requests received so far.
    pub(crate) fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

/// A loopback address nothing listens on.
pub(crate) fn unused_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Cannot bind");
    let addr = listener.local_addr().expect("No address");
    drop(listener);
    addr.to_string()
}
