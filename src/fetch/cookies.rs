use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Attributes that may appear in a raw `Set-Cookie` header but are not cookies themselves.
const COOKIE_ATTRIBUTES: &[&str] = &["path", "domain", "max-age", "samesite", "secure", "httponly"];

/// Session cookies plus the optional expiry attached by the handshake.
///
/// Serialises as a flat JSON object of cookie name to value with an optional `expires` key,
/// which is the layout of the persisted cookie file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, String>,
}

impl CookieSet {
    pub fn new(values: BTreeMap<String, String>, expires: Option<String>) -> Self {
        Self { expires, values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Render as the value of a `Cookie` request header.
    pub fn header_value(&self) -> Option<String> {
        if self.values.is_empty() {
            return None;
        }
        Some(
            self.values
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires.as_deref().and_then(parse_expires)
    }
}

/// Whether the set has passed its `expires` attribute at `now`.
///
/// A set without an `expires` attribute is never considered expired, and neither is one whose
/// attribute cannot be parsed.
pub fn is_expired(cookies: &CookieSet, now: DateTime<Utc>) -> bool {
    match cookies.expires.as_deref() {
        None | Some("") => false,
        Some(raw) => match parse_expires(raw) {
            Some(expires_at) => now > expires_at,
            None => {
                log::warn!("ignoring unparseable cookie expiry `{}`", raw);
                false
            }
        },
    }
}

pub fn format_expires(at: DateTime<Utc>) -> String {
    at.format(EXPIRES_FORMAT).to_string()
}

fn parse_expires(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%a, %d %b %Y %H:%M:%S GMT", "%a, %d-%b-%Y %H:%M:%S GMT"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Build a cookie set from raw `Set-Cookie` header values by splitting on `"; "` and `=`.
///
/// `expires` is lifted out as the set's expiry; other cookie attributes are dropped.
pub fn parse_set_cookie_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> CookieSet {
    let mut set = CookieSet::default();
    for header in headers {
        for pair in header.split("; ") {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if name.eq_ignore_ascii_case("expires") {
                set.expires.get_or_insert_with(|| value.trim().to_string());
                continue;
            }
            if COOKIE_ATTRIBUTES
                .iter()
                .any(|attr| name.eq_ignore_ascii_case(attr))
            {
                continue;
            }
            set.values.insert(name.to_string(), value.trim().to_string());
        }
    }
    set
}
