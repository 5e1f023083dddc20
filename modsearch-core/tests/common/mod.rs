//! Test helpers for integration tests
//!
//! Spins up an axum fixture server on an ephemeral port that serves scripted
//! catalog and listing documents and records what it was asked for.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// One scripted reply
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(value: serde_json::Value) -> Self {
        Self::raw(value.to_string())
    }

    pub fn raw(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: "{\"error\":\"scripted\"}".to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as the fixture saw it
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub query: Option<String>,
    pub cache_control: Option<String>,
}

#[derive(Default)]
struct FixtureState {
    replies: HashMap<String, Reply>,
    seen: Mutex<Vec<SeenRequest>>,
    abandoned: Mutex<Vec<String>>,
}

/// Records the path as abandoned if the handler is dropped before replying
struct InFlight {
    state: Arc<FixtureState>,
    path: String,
    replied: bool,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.replied {
            self.state.abandoned.lock().unwrap().push(self.path.clone());
        }
    }
}

/// Running fixture server; dropped with the test runtime
pub struct FixtureServer {
    pub addr: SocketAddr,
    state: Arc<FixtureState>,
}

impl FixtureServer {
    /// Serve `replies` keyed by request path (e.g. `/x/modules/catalog.json`)
    pub async fn start(replies: Vec<(&str, Reply)>) -> Self {
        init_test_logging();

        let state = Arc::new(FixtureState {
            replies: replies
                .into_iter()
                .map(|(path, reply)| (path.to_string(), reply))
                .collect(),
            seen: Mutex::new(Vec::new()),
            abandoned: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(serve).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Absolute URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.state.seen.lock().unwrap().clone()
    }

    pub fn seen_paths(&self) -> Vec<String> {
        self.seen().into_iter().map(|r| r.path).collect()
    }

    /// Paths whose handler was dropped before the reply was produced,
    /// which happens when the client closes the connection
    pub fn abandoned(&self) -> Vec<String> {
        self.state.abandoned.lock().unwrap().clone()
    }
}

async fn serve(State(state): State<Arc<FixtureState>>, uri: Uri, headers: HeaderMap) -> Response {
    state.seen.lock().unwrap().push(SeenRequest {
        path: uri.path().to_string(),
        query: uri.query().map(String::from),
        cache_control: headers
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    });

    let Some(reply) = state.replies.get(uri.path()).cloned() else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    let mut in_flight = InFlight {
        state: state.clone(),
        path: uri.path().to_string(),
        replied: false,
    };
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    in_flight.replied = true;

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
        .into_response()
}

/// A local address nothing is listening on
pub async fn unused_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
