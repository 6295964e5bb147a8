use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::error::{Context, Result};

use super::cookies::CookieSet;

/// One GET as issued by the fetcher; never mutated once built.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub cookies: CookieSet,
}

/// Cookie parsed out of a response by the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCookie {
    pub name: String,
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
    pub cookies: Vec<ResponseCookie>,
    /// Raw `Set-Cookie` header values, kept for the fallback parser.
    pub set_cookie: Vec<String>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            cookies: Vec::new(),
            set_cookie: Vec::new(),
        }
    }
}

/// Failure below the HTTP layer: connect errors, timeouts, truncated bodies.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Message(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &FetchRequest) -> std::result::Result<RawResponse, TransportError>;
}

/// Production transport over one shared `reqwest` client.
///
/// The client keeps no cookie jar of its own; cookies travel explicitly with each request so
/// every worker sees the shared session store's current set.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .http1_title_case_headers()
            .build()
            .context("Failed to construct HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &FetchRequest) -> std::result::Result<RawResponse, TransportError> {
        let mut headers = request.headers.clone();
        if let Some(cookie_header) = request.cookies.header_value() {
            let value = HeaderValue::from_str(&cookie_header).map_err(|err| {
                TransportError::Message(format!("invalid cookie header value: {err}"))
            })?;
            headers.insert(COOKIE, value);
        }

        let response = self
            .client
            .get(&request.url)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        let cookies = response
            .cookies()
            .map(|cookie| ResponseCookie {
                name: cookie.name().to_string(),
                value: cookie.value().to_string(),
                expires: cookie.expires().map(DateTime::<Utc>::from),
            })
            .collect();
        let set_cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            body,
            cookies,
            set_cookie,
        })
    }
}
