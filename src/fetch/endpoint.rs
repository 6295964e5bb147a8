use std::fmt;

use reqwest::Url;

use crate::utils::quote;

use super::FetchError;

/// Prefix applied to option-chain snapshot identifiers so they never collide with the quote
/// snapshot of the same symbol.
pub const OPTION_CHAIN_PREFIX: &str = "oc_";

/// JSON endpoints served under the exchange's `/api` path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AllIndices,
    IndexConstituents(String),
    OptionChainIndex(String),
    OptionChainEquity(String),
    EquityQuote(String),
    Underlyings,
}

impl Endpoint {
    fn path(&self) -> &'static str {
        match self {
            Endpoint::AllIndices => "allIndices",
            Endpoint::IndexConstituents(_) => "equity-stockIndices",
            Endpoint::OptionChainIndex(_) => "option-chain-indices",
            Endpoint::OptionChainEquity(_) => "option-chain-equities",
            Endpoint::EquityQuote(_) => "quote-equity",
            Endpoint::Underlyings => "underlying-information",
        }
    }

    fn query(&self) -> Option<(&'static str, &str)> {
        match self {
            Endpoint::IndexConstituents(index) => Some(("index", index)),
            Endpoint::OptionChainIndex(symbol)
            | Endpoint::OptionChainEquity(symbol)
            | Endpoint::EquityQuote(symbol) => Some(("symbol", symbol)),
            Endpoint::AllIndices | Endpoint::Underlyings => None,
        }
    }

    /// Full request URL with the index or symbol name escaped into the query string.
    pub fn url(&self, api_base: &str) -> Result<Url, FetchError> {
        let raw = format!("{}/{}", api_base.trim_end_matches('/'), self.path());
        let mut url =
            Url::parse(&raw).map_err(|err| FetchError::InvalidUrl(format!("{raw}: {err}")))?;
        if let Some((key, value)) = self.query() {
            url.set_query(Some(&format!("{key}={}", quote(value))));
        }
        Ok(url)
    }

    /// Name the snapshot for this endpoint is stored under.
    pub fn snapshot_id(&self) -> String {
        match self {
            Endpoint::AllIndices => "allIndices".to_string(),
            Endpoint::Underlyings => "underlyings".to_string(),
            Endpoint::IndexConstituents(name) | Endpoint::EquityQuote(name) => name.clone(),
            Endpoint::OptionChainIndex(symbol) | Endpoint::OptionChainEquity(symbol) => {
                format!("{OPTION_CHAIN_PREFIX}{symbol}")
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.query() {
            Some((_, value)) => write!(f, "{} [{}]", self.path(), value),
            None => f.write_str(self.path()),
        }
    }
}
