use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::fetch::{
    build_headers, Fetcher, HttpTransport, ResponseMarkers, RetryPolicy, SessionStore, Transport,
};
use crate::poll::Poller;
use crate::storage::SnapshotStore;

/// Wires the transport, session store, fetcher and snapshot store for one configuration.
pub struct App {
    config: Config,
    fetcher: Arc<Fetcher>,
    store: Arc<SnapshotStore>,
    poller: Poller,
}

impl App {
    pub fn from_config(config: Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.upstream.timeout())?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let headers = build_headers();
        let session = Arc::new(SessionStore::new(
            transport.clone(),
            config.upstream.base_url.clone(),
            headers.clone(),
            config.storage.cookie_file.clone(),
        ));
        let fetcher = Arc::new(Fetcher::new(
            transport,
            session,
            headers,
            config.upstream.api_base.clone(),
            ResponseMarkers::from(&config.upstream),
            RetryPolicy::from_config(&config.retry),
        )
        .with_concurrency_limit(config.poll.concurrency_limit));
        let store = Arc::new(SnapshotStore::new(config.storage.snapshot_dir.clone()));
        let poller = Poller::new(fetcher.clone(), store.clone(), config.poll.interval());

        Self {
            config,
            fetcher,
            store,
            poller,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn session(&self) -> &SessionStore {
        self.fetcher.session()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }
}
