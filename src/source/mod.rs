//! Data acquisition from the Chamber of Deputies API.
//!
//! [`DataSource`] owns the HTTP client and the result cache. The bill
//! collector, the author resolver and the party resolver are implemented
//! on it in the submodules.

pub mod authors;
pub mod bills;
pub mod parties;

use crate::api::transport::ReqwestTransport;
use crate::api::{ApiClient, Transport};
use crate::cache::QueryCache;
use crate::config::Config;
use crate::pacing::{Sleeper, TokioSleeper};
use std::time::Duration;

/// Collection settings taken from the configuration.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Proposal type code to list.
    pub bill_type: String,
    /// Records per listing page.
    pub page_size: u32,
    /// Pause between listing pages of the same year.
    pub page_delay: Duration,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SourceSettings {
    fn from(config: &Config) -> Self {
        Self {
            bill_type: config.aggregation.bill_type.clone(),
            page_size: config.aggregation.page_size,
            page_delay: config.pacing.page_delay(),
        }
    }
}

/// Counts of cached results, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub bill_queries: usize,
    pub author_lists: usize,
    pub parties: usize,
    pub party_counts: usize,
}

/// Cached, paced access to the open-data endpoints.
pub struct DataSource<T = ReqwestTransport, S = TokioSleeper> {
    client: ApiClient<T, S>,
    cache: QueryCache,
    settings: SourceSettings,
}

impl DataSource {
    /// Build a data source with a real HTTP client from the configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = ApiClient::from_config(config)?;
        Ok(Self::new(
            client,
            Duration::from_secs(config.cache.ttl_seconds),
            SourceSettings::from(config),
        ))
    }
}

impl<T: Transport, S: Sleeper> DataSource<T, S> {
    pub fn new(client: ApiClient<T, S>, cache_ttl: Duration, settings: SourceSettings) -> Self {
        Self {
            client,
            cache: QueryCache::new(cache_ttl),
            settings,
        }
    }

    pub fn client(&self) -> &ApiClient<T, S> {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            bill_queries: self.cache.bills.len(),
            author_lists: self.cache.authors.len(),
            parties: self.cache.parties.len(),
            party_counts: self.cache.party_counts.len(),
        }
    }
}
