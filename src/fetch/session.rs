use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::utils::write_atomically;

use super::cookies::{format_expires, is_expired, parse_set_cookie_headers, CookieSet};
use super::transport::{FetchRequest, RawResponse, Transport, TransportError};

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("cookie handshake returned status {0}; retry again in a minute")]
    Status(StatusCode),
    #[error("cookie handshake failed: {0}")]
    Transport(#[from] TransportError),
    #[error("cookie handshake returned no cookies")]
    NoCookies,
    #[error("cookie file {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cookie set still unavailable after a fresh handshake")]
    Unavailable,
}

/// Cookie set handed to a request together with the generation it was read at.
///
/// The generation lets a worker that saw an expired session ask for renewal only if nobody
/// else has replaced the set in the meantime.
#[derive(Debug, Clone)]
pub struct Session {
    pub cookies: CookieSet,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct SessionState {
    cookies: Option<CookieSet>,
    generation: u64,
}

/// Shared, read-mostly holder of the exchange session cookie.
///
/// Every request reads the current set; only renewal writes, serialised behind `renewal`.
pub struct SessionStore {
    transport: Arc<dyn Transport>,
    handshake_url: String,
    headers: HeaderMap,
    cookie_path: PathBuf,
    state: RwLock<SessionState>,
    renewal: Mutex<()>,
}

impl SessionStore {
    pub fn new(
        transport: Arc<dyn Transport>,
        handshake_url: impl Into<String>,
        headers: HeaderMap,
        cookie_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            handshake_url: handshake_url.into(),
            headers,
            cookie_path: cookie_path.into(),
            state: RwLock::new(SessionState::default()),
            renewal: Mutex::new(()),
        }
    }

    pub fn cookie_path(&self) -> &Path {
        &self.cookie_path
    }

    /// Handshake with the landing page and persist whatever cookies it hands out.
    ///
    /// A non-200 handshake deletes the persisted cookie file so a stale set is never reused.
    pub async fn acquire(&self) -> Result<CookieSet, AcquisitionError> {
        let request = FetchRequest {
            url: self.handshake_url.clone(),
            headers: self.headers.clone(),
            cookies: CookieSet::default(),
        };
        let response = self.transport.get(&request).await?;

        if response.status != StatusCode::OK {
            log::warn!(
                "cookie handshake returned {}; removing {}",
                response.status,
                self.cookie_path.display()
            );
            self.remove_cookie_file();
            return Err(AcquisitionError::Status(response.status));
        }

        let cookies = extract_cookies(&response);
        if cookies.is_empty() {
            return Err(AcquisitionError::NoCookies);
        }

        self.persist(&cookies)?;
        log::info!(
            "cookie has been fetched and stored in {}",
            self.cookie_path.display()
        );
        Ok(cookies)
    }

    /// Return the session, reading the cookie file on first use.
    ///
    /// A missing or empty file triggers exactly one handshake followed by one more read.
    pub async fn load(&self) -> Result<Session, AcquisitionError> {
        if let Some(session) = self.cached().await {
            return Ok(session);
        }

        if let Some(cookies) = self.read_cookie_file()? {
            return Ok(self.install_if_absent(cookies).await);
        }

        log::info!("cookie file not found; fetching a new cookie");
        let _guard = self.renewal.lock().await;
        if let Some(session) = self.cached().await {
            return Ok(session);
        }
        self.acquire().await?;
        match self.read_cookie_file()? {
            Some(cookies) => Ok(self.install(cookies).await),
            None => Err(AcquisitionError::Unavailable),
        }
    }

    /// Unconditionally re-run the handshake and replace the in-memory and persisted set.
    pub async fn renew(&self) -> Result<Session, AcquisitionError> {
        let _guard = self.renewal.lock().await;
        log::info!("renewing cookie");
        let cookies = self.acquire().await?;
        Ok(self.install(cookies).await)
    }

    /// Renew unless another worker already replaced the set observed at `seen_generation`.
    pub async fn renew_from(&self, seen_generation: u64) -> Result<Session, AcquisitionError> {
        let _guard = self.renewal.lock().await;
        {
            let state = self.state.read().await;
            if let (Some(cookies), true) = (&state.cookies, state.generation != seen_generation) {
                log::debug!(
                    "cookie already renewed (generation {} -> {})",
                    seen_generation,
                    state.generation
                );
                return Ok(Session {
                    cookies: cookies.clone(),
                    generation: state.generation,
                });
            }
        }
        log::info!("renewing cookie");
        let cookies = self.acquire().await?;
        Ok(self.install(cookies).await)
    }

    /// Session to attach to the next request, renewed first if its expiry has passed.
    pub async fn current(&self) -> Result<Session, AcquisitionError> {
        let session = self.load().await?;
        if is_expired(&session.cookies, Utc::now()) {
            log::info!("stored cookie has expired");
            return self.renew_from(session.generation).await;
        }
        Ok(session)
    }

    async fn cached(&self) -> Option<Session> {
        let state = self.state.read().await;
        state.cookies.as_ref().map(|cookies| Session {
            cookies: cookies.clone(),
            generation: state.generation,
        })
    }

    async fn install(&self, cookies: CookieSet) -> Session {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.cookies = Some(cookies.clone());
        Session {
            cookies,
            generation: state.generation,
        }
    }

    async fn install_if_absent(&self, cookies: CookieSet) -> Session {
        let mut state = self.state.write().await;
        if let Some(existing) = &state.cookies {
            return Session {
                cookies: existing.clone(),
                generation: state.generation,
            };
        }
        state.generation += 1;
        state.cookies = Some(cookies.clone());
        Session {
            cookies,
            generation: state.generation,
        }
    }

    fn read_cookie_file(&self) -> Result<Option<CookieSet>, AcquisitionError> {
        let content = match std::fs::read_to_string(&self.cookie_path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AcquisitionError::Storage {
                    path: self.cookie_path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str::<CookieSet>(&content) {
            Ok(cookies) if !cookies.is_empty() => Ok(Some(cookies)),
            Ok(_) => Ok(None),
            Err(err) => {
                log::warn!(
                    "ignoring unreadable cookie file {}: {}",
                    self.cookie_path.display(),
                    err
                );
                Ok(None)
            }
        }
    }

    fn persist(&self, cookies: &CookieSet) -> Result<(), AcquisitionError> {
        let storage_err = |source: std::io::Error| AcquisitionError::Storage {
            path: self.cookie_path.clone(),
            source,
        };
        let json = serde_json::to_vec(cookies).map_err(|err| storage_err(err.into()))?;
        write_atomically(&self.cookie_path, &json).map_err(storage_err)
    }

    fn remove_cookie_file(&self) {
        match std::fs::remove_file(&self.cookie_path) {
            Ok(()) => log::info!("deleted {}", self.cookie_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!("{} not found", self.cookie_path.display())
            }
            Err(err) => log::warn!(
                "failed to delete {}: {}",
                self.cookie_path.display(),
                err
            ),
        }
    }
}

/// Prefer cookies the HTTP client parsed; fall back to splitting raw `Set-Cookie` headers.
fn extract_cookies(response: &RawResponse) -> CookieSet {
    if !response.cookies.is_empty() {
        let values: BTreeMap<String, String> = response
            .cookies
            .iter()
            .map(|cookie| (cookie.name.clone(), cookie.value.clone()))
            .collect();
        let expires = response
            .cookies
            .iter()
            .filter_map(|cookie| cookie.expires)
            .min()
            .map(format_expires);
        return CookieSet::new(values, expires);
    }

    parse_set_cookie_headers(response.set_cookie.iter().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::headers::build_headers;
    use crate::fetch::testing::{handshake_ok, ScriptedTransport, HANDSHAKE_URL};
    use chrono::TimeZone;

    fn store(transport: &Arc<ScriptedTransport>, dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::new(
            transport.clone(),
            HANDSHAKE_URL,
            build_headers(),
            dir.path().join("cookie.json"),
        )
    }

    #[tokio::test]
    async fn load_acquires_once_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        let store = store(&transport, &dir);

        let session = store.load().await.unwrap();
        assert_eq!(session.cookies.get("nsit"), Some("fresh-1"));
        assert!(dir.path().join("cookie.json").exists());

        // Served from memory afterwards.
        store.load().await.unwrap();
        assert_eq!(transport.handshake_count(), 1);
    }

    #[tokio::test]
    async fn load_reads_existing_cookie_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cookie.json"), r#"{"nsit": "persisted"}"#).unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        let store = store(&transport, &dir);

        let session = store.load().await.unwrap();
        assert_eq!(session.cookies.get("nsit"), Some("persisted"));
        assert_eq!(transport.handshake_count(), 0);
    }

    #[tokio::test]
    async fn empty_cookie_file_triggers_acquisition() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cookie.json"), "{}").unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        let store = store(&transport, &dir);

        let session = store.load().await.unwrap();
        assert!(!session.cookies.is_empty());
        assert_eq!(transport.handshake_count(), 1);
    }

    #[tokio::test]
    async fn failed_handshake_removes_stale_cookie_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookie.json");
        std::fs::write(&path, r#"{"nsit": "stale"}"#).unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_handshake(Ok(RawResponse::new(StatusCode::SERVICE_UNAVAILABLE, "")));
        let store = store(&transport, &dir);

        let err = store.renew().await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Status(StatusCode::SERVICE_UNAVAILABLE)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn load_fails_after_one_bounded_retry() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_handshake(Ok(RawResponse::new(StatusCode::FORBIDDEN, "")));
        let store = store(&transport, &dir);

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Status(StatusCode::FORBIDDEN)));
        assert_eq!(transport.handshake_count(), 1);
    }

    #[tokio::test]
    async fn handshake_without_cookies_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_handshake(Ok(RawResponse::new(StatusCode::OK, "<html></html>")));
        let store = store(&transport, &dir);

        let err = store.acquire().await.unwrap_err();
        assert!(matches!(err, AcquisitionError::NoCookies));
    }

    #[tokio::test]
    async fn falls_back_to_raw_set_cookie_header() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        let mut response = RawResponse::new(StatusCode::OK, "");
        response.set_cookie = vec!["bm_sv=raw; Path=/; expires=Wed, 21 Oct 2099 07:28:00 GMT".into()];
        transport.push_handshake(Ok(response));
        let store = store(&transport, &dir);

        let cookies = store.acquire().await.unwrap();
        assert_eq!(cookies.get("bm_sv"), Some("raw"));
        assert_eq!(
            cookies.expires_at(),
            Some(Utc.with_ymd_and_hms(2099, 10, 21, 7, 28, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn expired_cookie_is_renewed_before_use() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cookie.json"),
            r#"{"nsit": "old", "expires": "Wed, 21 Oct 2015 07:28:00 GMT"}"#,
        )
        .unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        let store = store(&transport, &dir);

        let session = store.current().await.unwrap();
        assert_eq!(session.cookies.get("nsit"), Some("fresh-1"));
        assert_eq!(transport.handshake_count(), 1);
    }

    #[tokio::test]
    async fn renew_from_skips_when_generation_moved_on() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        let store = store(&transport, &dir);

        let first = store.load().await.unwrap();
        let renewed = store.renew_from(first.generation).await.unwrap();
        assert_eq!(renewed.cookies.get("nsit"), Some("fresh-2"));

        // A second worker that still holds the first generation reuses the renewed set.
        let again = store.renew_from(first.generation).await.unwrap();
        assert_eq!(again.cookies.get("nsit"), Some("fresh-2"));
        assert_eq!(transport.handshake_count(), 2);
    }

    #[test]
    fn jar_cookies_take_precedence_over_raw_header() {
        let mut response = handshake_ok("jar");
        response.set_cookie = vec!["ignored=1".into()];
        let cookies = extract_cookies(&response);
        assert_eq!(cookies.get("nsit"), Some("jar"));
        assert_eq!(cookies.get("ignored"), None);
    }
}
