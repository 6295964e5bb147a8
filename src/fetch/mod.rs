pub mod cookies;
pub mod discovery;
pub mod endpoint;
pub mod fetcher;
pub mod headers;
pub mod retry;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use cookies::{is_expired, CookieSet};
pub use discovery::{discover_indices, discover_underlyings, Underlyings};
pub use endpoint::Endpoint;
pub use fetcher::{classify, FetchError, FetchOutcome, Fetcher, ResponseMarkers};
pub use headers::build_headers;
pub use retry::RetryPolicy;
pub use session::{AcquisitionError, Session, SessionStore};
pub use transport::{FetchRequest, HttpTransport, RawResponse, Transport, TransportError};

/// Default cap on simultaneous in-flight fetches across all poll workers.
pub const FETCH_CONCURRENCY_LIMIT: usize = 5;

#[inline]
pub fn ensure_concurrency_limit(limit: usize) -> usize {
    limit.max(1)
}
