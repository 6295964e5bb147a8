use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::fetch::{discover_indices, discover_underlyings, Endpoint};

use super::App;

/// What the user asked the poll loop to track.
#[derive(Debug, Clone, Default)]
pub struct TargetSelection {
    pub names: Vec<String>,
    pub all_indices: bool,
    pub option_chain: bool,
}

impl App {
    /// Resolve a selection into concrete endpoints, consulting the exchange listings when needed.
    ///
    /// With no names and no flags every listed index is tracked. With `option_chain`, names are
    /// matched against the underlyings listing to decide between the index and equity chain, and
    /// an empty name list tracks every underlying.
    pub async fn resolve_targets(
        &self,
        selection: &TargetSelection,
        shutdown: &CancellationToken,
    ) -> Result<Vec<Endpoint>> {
        let mut targets = Vec::new();

        if selection.option_chain {
            let underlyings = discover_underlyings(self.fetcher(), shutdown).await?;
            if selection.names.is_empty() {
                targets.extend(underlyings.indices.iter().cloned().map(Endpoint::OptionChainIndex));
                targets.extend(underlyings.stocks.iter().cloned().map(Endpoint::OptionChainEquity));
            } else {
                for name in &selection.names {
                    let endpoint = if underlyings.indices.contains(name) {
                        Endpoint::OptionChainIndex(name.clone())
                    } else {
                        Endpoint::OptionChainEquity(name.clone())
                    };
                    targets.push(endpoint);
                }
            }
        } else {
            targets.extend(selection.names.iter().cloned().map(Endpoint::IndexConstituents));
        }

        let wants_listing =
            selection.all_indices || (selection.names.is_empty() && !selection.option_chain);
        if wants_listing {
            for index in discover_indices(self.fetcher(), shutdown).await? {
                let endpoint = Endpoint::IndexConstituents(index);
                if !targets.contains(&endpoint) {
                    targets.push(endpoint);
                }
            }
        }

        log::info!("resolved {} poll target(s)", targets.len());
        Ok(targets)
    }
}
