//! Scripted transport used by unit tests in place of the network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Barrier;

use crate::config::Config;

use super::cookies::CookieSet;
use super::fetcher::{Fetcher, ResponseMarkers};
use super::headers::build_headers;
use super::retry::RetryPolicy;
use super::session::SessionStore;
use super::transport::{FetchRequest, RawResponse, ResponseCookie, Transport, TransportError};

pub const HANDSHAKE_URL: &str = "https://www.nseindia.com";
pub const API_BASE: &str = "https://www.nseindia.com/api";

type Scripted = Result<RawResponse, String>;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub cookies: CookieSet,
}

/// Plays back queued responses per URL and records every request it sees.
///
/// Handshakes without a queued response succeed with a cookie `nsit=fresh-<n>`; API URLs with
/// an empty queue answer with the fallback response.
pub struct ScriptedTransport {
    handshakes: Mutex<VecDeque<Scripted>>,
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    fallback: Mutex<Scripted>,
    gates: Mutex<HashMap<String, Arc<Barrier>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    handshake_count: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            handshakes: Mutex::new(VecDeque::new()),
            scripts: Mutex::new(HashMap::new()),
            fallback: Mutex::new(Ok(RawResponse::new(StatusCode::OK, r#"{"data": []}"#))),
            gates: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            handshake_count: AtomicUsize::new(0),
        }
    }

    pub fn push_handshake(&self, response: Result<RawResponse, TransportError>) {
        self.handshakes
            .lock()
            .unwrap()
            .push_back(response.map_err(|err| err.to_string()));
    }

    pub fn script(&self, url: &str, responses: Vec<Scripted>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(responses);
    }

    pub fn set_fallback(&self, response: Scripted) {
        *self.fallback.lock().unwrap() = response;
    }

    /// Hold the next request for `url` at `barrier` before answering it. Later requests for the
    /// same URL pass straight through.
    pub fn gate_next(&self, url: &str, barrier: Arc<Barrier>) {
        self.gates.lock().unwrap().insert(url.to_string(), barrier);
    }

    pub fn handshake_count(&self) -> usize {
        self.handshake_count.load(Ordering::SeqCst)
    }

    pub fn requests_for(&self, url: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url == url)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &FetchRequest) -> Result<RawResponse, TransportError> {
        if request.url == HANDSHAKE_URL {
            let n = self.handshake_count.fetch_add(1, Ordering::SeqCst) + 1;
            let queued = self.handshakes.lock().unwrap().pop_front();
            return match queued {
                Some(response) => response.map_err(TransportError::Message),
                None => Ok(handshake_ok(&format!("fresh-{n}"))),
            };
        }

        self.requests.lock().unwrap().push(RecordedRequest {
            url: request.url.clone(),
            cookies: request.cookies.clone(),
        });

        let gate = self.gates.lock().unwrap().remove(&request.url);
        if let Some(barrier) = gate {
            barrier.wait().await;
        }

        let queued = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front);
        let response = queued.unwrap_or_else(|| self.fallback.lock().unwrap().clone());
        response.map_err(TransportError::Message)
    }
}

pub fn handshake_ok(nsit: &str) -> RawResponse {
    let mut response = RawResponse::new(StatusCode::OK, "<html></html>");
    response.cookies = vec![ResponseCookie {
        name: "nsit".to_string(),
        value: nsit.to_string(),
        expires: None,
    }];
    response
}

pub fn json_ok(payload: Value) -> Scripted {
    Ok(RawResponse::new(StatusCode::OK, payload.to_string()))
}

pub fn forbidden(body: &str) -> Scripted {
    Ok(RawResponse::new(StatusCode::FORBIDDEN, body))
}

pub fn status_only(status: StatusCode, body: &str) -> Scripted {
    Ok(RawResponse::new(status, body))
}

pub fn transport_error(cause: &str) -> Scripted {
    Err(cause.to_string())
}

/// Scripted transport plus a session store whose cookie file lives in a scratch directory.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub transport: Arc<ScriptedTransport>,
    pub session: Arc<SessionStore>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        let session = Arc::new(SessionStore::new(
            transport.clone(),
            HANDSHAKE_URL,
            build_headers(),
            dir.path().join("cookie.json"),
        ));
        Self {
            dir,
            transport,
            session,
        }
    }

    /// Harness whose cookie file already holds `nsit=<value>`.
    pub fn with_cookie(value: &str) -> Self {
        let harness = Self::new();
        let cookies = serde_json::json!({ "nsit": value });
        std::fs::write(harness.session.cookie_path(), cookies.to_string()).unwrap();
        harness
    }

    pub fn fetcher(&self) -> Fetcher {
        let config = Config::builtin();
        Fetcher::new(
            self.transport.clone(),
            self.session.clone(),
            build_headers(),
            API_BASE,
            ResponseMarkers::from(&config.upstream),
            RetryPolicy::from_config(&config.retry),
        )
    }
}
