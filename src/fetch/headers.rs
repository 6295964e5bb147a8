use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Header set the exchange expects on every request.
///
/// The upstream gates on the shape of these headers as well as on the cookie, so values must
/// stay byte-for-byte identical. Names are lowercase here; the transport writes them title-cased.
pub const EXCHANGE_HEADERS: [(&str, &str); 8] = [
    ("host", "www.nseindia.com"),
    (
        "user-agent",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1.2 Safari/605.1.15",
    ),
    ("accept", "*/*"),
    ("accept-language", "en-US,en;q=0.5"),
    ("accept-encoding", "gzip, deflate, br"),
    ("x-requested-with", "XMLHttpRequest"),
    ("dnt", "1"),
    ("connection", "keep-alive"),
];

pub fn build_headers() -> HeaderMap {
    let mut map = HeaderMap::with_capacity(EXCHANGE_HEADERS.len());
    for (name, value) in EXCHANGE_HEADERS {
        map.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    map
}
