use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::UpstreamConfig;

use super::endpoint::Endpoint;
use super::{ensure_concurrency_limit, FETCH_CONCURRENCY_LIMIT};
use super::retry::RetryPolicy;
use super::session::{AcquisitionError, SessionStore};
use super::transport::{FetchRequest, RawResponse, Transport, TransportError};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error("{endpoint}: unexpected status code {status}")]
    Unrecognized { endpoint: String, status: StatusCode },
    #[error("{endpoint}: failed after {attempts} attempts ({last})")]
    Exhausted {
        endpoint: String,
        attempts: u32,
        last: String,
    },
    #[error("{endpoint}: session still expired after {renewals} renewal(s)")]
    SessionRejected { endpoint: String, renewals: u32 },
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
    #[error("fetch cancelled")]
    Cancelled,
}

/// Body substrings that tell the two soft 403 responses apart.
#[derive(Debug, Clone)]
pub struct ResponseMarkers {
    pub session_expired: String,
    pub access_restricted: String,
}

impl From<&UpstreamConfig> for ResponseMarkers {
    fn from(upstream: &UpstreamConfig) -> Self {
        Self {
            session_expired: upstream.session_expired_marker.clone(),
            access_restricted: upstream.access_restricted_marker.clone(),
        }
    }
}

/// Verdict on a single attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    Success(Value),
    SessionExpired,
    RateLimited,
    TransientError(String),
    Unrecognized(StatusCode),
}

pub fn classify(response: &RawResponse, markers: &ResponseMarkers) -> FetchOutcome {
    match response.status {
        StatusCode::OK => match serde_json::from_str(&response.body) {
            Ok(payload) => FetchOutcome::Success(payload),
            Err(err) => FetchOutcome::TransientError(format!("malformed JSON body: {err}")),
        },
        StatusCode::FORBIDDEN if response.body.contains(&markers.session_expired) => {
            FetchOutcome::SessionExpired
        }
        StatusCode::FORBIDDEN if response.body.contains(&markers.access_restricted) => {
            FetchOutcome::RateLimited
        }
        status => FetchOutcome::Unrecognized(status),
    }
}

/// Cookie-gated GET with session renewal and retry budgets.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    headers: HeaderMap,
    api_base: String,
    markers: ResponseMarkers,
    policy: RetryPolicy,
    /// Held only while a request is on the wire, never across a backoff sleep.
    permits: Arc<Semaphore>,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<SessionStore>,
        headers: HeaderMap,
        api_base: impl Into<String>,
        markers: ResponseMarkers,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            session,
            headers,
            api_base: api_base.into(),
            markers,
            policy,
            permits: Arc::new(Semaphore::new(FETCH_CONCURRENCY_LIMIT)),
        }
    }

    /// Cap simultaneous in-flight requests across every caller sharing this fetcher.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(ensure_concurrency_limit(limit)));
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch one endpoint's JSON payload.
    ///
    /// An expired session is renewed and the attempt budget starts over, at most
    /// `max_renewals` times. Access restrictions wait out the cooldown plus a jittered backoff,
    /// transport faults and malformed bodies wait the short transport delay; both consume the
    /// budget. Any other status fails immediately.
    pub async fn fetch(
        &self,
        endpoint: &Endpoint,
        shutdown: &CancellationToken,
    ) -> Result<Value, FetchError> {
        let url = endpoint.url(&self.api_base)?.to_string();
        log::debug!("fetching {}", url);

        let mut renewals = 0;
        'session: loop {
            let mut last_failure = String::from("no attempt made");

            for attempt in 0..self.policy.max_retries {
                if shutdown.is_cancelled() {
                    return Err(FetchError::Cancelled);
                }

                let session = self.session.current().await?;
                let request = FetchRequest {
                    url: url.clone(),
                    headers: self.headers.clone(),
                    cookies: session.cookies,
                };

                let result = tokio::select! {
                    _ = shutdown.cancelled() => return Err(FetchError::Cancelled),
                    result = self.send(&request) => result?,
                };

                let outcome = match result {
                    Ok(response) => {
                        log::debug!("{} response status code: {}", endpoint, response.status);
                        classify(&response, &self.markers)
                    }
                    Err(err) => FetchOutcome::TransientError(err.to_string()),
                };

                match outcome {
                    FetchOutcome::Success(payload) => return Ok(payload),
                    FetchOutcome::SessionExpired => {
                        if renewals >= self.policy.max_renewals {
                            log::error!(
                                "{}: cookie expired again after {} renewal(s); giving up",
                                endpoint,
                                renewals
                            );
                            return Err(FetchError::SessionRejected {
                                endpoint: endpoint.to_string(),
                                renewals,
                            });
                        }
                        log::warn!("{}: cookie expired, renewing and retrying", endpoint);
                        renewals += 1;
                        self.session.renew_from(session.generation).await?;
                        continue 'session;
                    }
                    FetchOutcome::RateLimited => {
                        last_failure = "access restricted".to_string();
                        if self.policy.has_attempts_after(attempt) {
                            let (cooldown, backoff) = self.policy.rate_limit_delays(attempt);
                            log::warn!(
                                "{}: access restricted, waiting {:?} then {:.2?} before retry {}/{}",
                                endpoint,
                                cooldown,
                                backoff,
                                attempt + 2,
                                self.policy.max_retries
                            );
                            self.pause(cooldown, shutdown).await?;
                            self.pause(backoff, shutdown).await?;
                        }
                    }
                    FetchOutcome::TransientError(cause) => {
                        log::warn!("{}: error: {}", endpoint, cause);
                        last_failure = cause;
                        if self.policy.has_attempts_after(attempt) {
                            log::info!(
                                "{}: retrying {}/{}...",
                                endpoint,
                                attempt + 2,
                                self.policy.max_retries
                            );
                            self.pause(self.policy.transport_retry_delay, shutdown)
                                .await?;
                        }
                    }
                    FetchOutcome::Unrecognized(status) => {
                        log::error!("{}: failed with status code {}", endpoint, status);
                        return Err(FetchError::Unrecognized {
                            endpoint: endpoint.to_string(),
                            status,
                        });
                    }
                }
            }

            log::error!(
                "failed to retrieve {} after {} attempts",
                endpoint,
                self.policy.max_retries
            );
            return Err(FetchError::Exhausted {
                endpoint: endpoint.to_string(),
                attempts: self.policy.max_retries,
                last: last_failure,
            });
        }
    }

    async fn send(
        &self,
        request: &FetchRequest,
    ) -> Result<Result<RawResponse, TransportError>, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::Cancelled)?;
        Ok(self.transport.get(request).await)
    }

    async fn pause(&self, delay: Duration, shutdown: &CancellationToken) -> Result<(), FetchError> {
        tokio::select! {
            _ = shutdown.cancelled() => Err(FetchError::Cancelled),
            _ = sleep(delay) => Ok(()),
        }
    }
}
