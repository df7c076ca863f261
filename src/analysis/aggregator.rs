//! Bill aggregation and statistics.
//!
//! This module drives the bill → author → legislator → party join and
//! computes the per-month series and the sample table.

use crate::api::Transport;
use crate::cache::PartyCountKey;
use crate::config::Config;
use crate::models::{Bill, BillPreview, MonthlyCount, PartyCounts};
use crate::pacing::{Sleeper, Throttle};
use crate::source::DataSource;
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings for party aggregation.
#[derive(Debug, Clone)]
pub struct AggregateSettings {
    /// Bills used when not resolving all of them.
    pub sample_limit: usize,
    /// Bills between two pauses.
    pub batch_size: usize,
    /// Length of each pause.
    pub batch_delay: Duration,
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AggregateSettings {
    fn from(config: &Config) -> Self {
        Self {
            sample_limit: config.aggregation.sample_limit,
            batch_size: config.pacing.batch_size,
            batch_delay: config.pacing.batch_delay(),
        }
    }
}

/// Bill ids that feed the party counts, in input order.
pub fn sample_ids(bills: &[Bill], use_all: bool, sample_limit: usize) -> Vec<u64> {
    let ids = bills.iter().map(|b| b.id);
    if use_all {
        ids.collect()
    } else {
        ids.take(sample_limit).collect()
    }
}

/// Count parliamentary authors per party over the (possibly sampled) bills.
///
/// Each bill-author pairing counts once, so a legislator who authored
/// several bills is counted once per bill. Authors whose party cannot be
/// resolved are left out.
pub async fn party_counts<T: Transport, S: Sleeper>(
    source: &mut DataSource<T, S>,
    bills: &[Bill],
    use_all: bool,
    settings: &AggregateSettings,
    progress: &ProgressBar,
) -> PartyCounts {
    let key = PartyCountKey {
        bill_ids: bills.iter().map(|b| b.id).collect(),
        use_all,
    };
    if let Some(counts) = source.cache().party_counts.get(&key) {
        debug!("Party counts served from cache");
        return counts;
    }

    let ids = sample_ids(bills, use_all, settings.sample_limit);
    info!(
        "Resolving authors for {} of {} bills",
        ids.len(),
        bills.len()
    );

    let failures_before = source.client().warning_count();
    let sleeper = source.client().sleeper().clone();
    let mut pacing = Throttle::new(settings.batch_size, settings.batch_delay);
    let mut parties: Vec<String> = Vec::new();

    progress.set_length(ids.len() as u64);

    for bill_id in &ids {
        pacing.tick(&sleeper).await;

        let authors = source.authors_of(*bill_id).await;
        for author in authors {
            if !author.is_parliamentary() {
                continue;
            }
            let Some(legislator_id) = author.legislator_id() else {
                continue;
            };

            let party = source.party_of(legislator_id).await;
            if !party.is_empty() {
                parties.push(party);
            }
        }

        progress.inc(1);
    }

    let counts = PartyCounts::from_codes(parties);
    info!(
        "Processed {} bills: {} parliamentary authors across {} parties",
        pacing.calls(),
        counts.total(),
        counts.len()
    );

    if source.client().warning_count() == failures_before {
        source.cache().party_counts.insert(key, counts.clone());
    } else {
        warn!("Some author or party lookups failed; party counts not cached");
    }
    counts
}

/// Bills per `YYYY-MM` bucket, oldest first. Bills without a date are
/// not counted.
pub fn monthly_counts(bills: &[Bill]) -> Vec<MonthlyCount> {
    let mut buckets: BTreeMap<&str, usize> = BTreeMap::new();

    for bill in bills {
        if let Some(ref month) = bill.year_month {
            *buckets.entry(month.as_str()).or_default() += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(year_month, bills)| MonthlyCount {
            year_month: year_month.to_string(),
            bills,
        })
        .collect()
}

/// The first `n` bills projected to the sample-table columns.
pub fn preview(bills: &[Bill], n: usize) -> Vec<BillPreview> {
    bills.iter().take(n).map(BillPreview::from).collect()
}
