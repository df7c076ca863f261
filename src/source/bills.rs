//! Bill collector: pages through `/proposicoes` year by year.

use super::DataSource;
use crate::api::Transport;
use crate::models::{Bill, ListingPage};
use crate::pacing::{Sleeper, Throttle};
use tracing::{debug, info, warn};

/// Bills gathered for one year, and whether every page came back.
struct YearHarvest {
    bills: Vec<Bill>,
    complete: bool,
}

impl<T: Transport, S: Sleeper> DataSource<T, S> {
    /// Collect every bill presented between `start_year` and `end_year`
    /// inclusive, in year and page order.
    ///
    /// An empty result means the API had nothing for the period; failed
    /// pages are reported as warnings on the client. Fully successful
    /// collections are served from the cache on repeat calls.
    pub async fn collect(&mut self, start_year: i32, end_year: i32) -> Vec<Bill> {
        let key = (start_year, end_year);
        if let Some(bills) = self.cache.bills.get(&key) {
            debug!("Bills {}-{} served from cache", start_year, end_year);
            return bills;
        }

        let mut bills = Vec::new();
        let mut complete = true;

        for year in start_year..=end_year {
            let harvest = self.collect_year(year).await;
            complete &= harvest.complete;
            bills.extend(harvest.bills);
        }

        let before = bills.len();
        bills.retain(|bill| match bill.year {
            Some(year) => (start_year..=end_year).contains(&year),
            None => true,
        });
        if bills.len() < before {
            debug!(
                "Dropped {} bills presented outside {}-{}",
                before - bills.len(),
                start_year,
                end_year
            );
        }

        info!(
            "Collected {} bills for {}-{}",
            bills.len(),
            start_year,
            end_year
        );

        if complete {
            self.cache.bills.insert(key, bills.clone());
        } else {
            warn!("Some listing pages failed; result for {}-{} not cached", start_year, end_year);
        }

        bills
    }

    async fn collect_year(&self, year: i32) -> YearHarvest {
        let mut bills = Vec::new();
        let mut page = 1u32;
        let mut pause = Throttle::each(self.settings.page_delay);

        loop {
            let query = self.listing_query(year, page);
            let Some(json) = self.client.fetch("/proposicoes", &query).await else {
                warn!("Stopped collecting {} at page {}", year, page);
                return YearHarvest {
                    bills,
                    complete: false,
                };
            };

            let listing = ListingPage::from_json(&json);
            let received = listing.records.len();
            debug!("{} page {}: {} records", year, page, received);

            for record in &listing.records {
                match Bill::from_json(record) {
                    Some(bill) => bills.push(bill),
                    None => debug!("Skipping listing record without id: {}", record),
                }
            }

            if !listing.has_next || received == 0 {
                break;
            }

            page += 1;
            pause.tick(self.client.sleeper()).await;
        }

        YearHarvest {
            bills,
            complete: true,
        }
    }

    fn listing_query(&self, year: i32, page: u32) -> Vec<(String, String)> {
        vec![
            ("siglaTipo".to_string(), self.settings.bill_type.clone()),
            ("dataApresentacaoInicio".to_string(), format!("{}-01-01", year)),
            ("dataApresentacaoFim".to_string(), format!("{}-12-31", year)),
            ("itens".to_string(), self.settings.page_size.to_string()),
            ("pagina".to_string(), page.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::source;
    use super::*;
    use crate::testing::{bill_record, json_response, status_response, FakeApi, ScriptedTransport};
    use serde_json::json;
    use std::time::Duration;

    fn full_page(year: i32, first_id: u64) -> Vec<serde_json::Value> {
        (0..100)
            .map(|i| bill_record(first_id + i, &format!("{}-03-15T10:00", year)))
            .collect()
    }

    #[tokio::test]
    async fn test_pagination_stops_at_page_without_next() {
        let api = FakeApi::new().year(
            2022,
            vec![
                full_page(2022, 1_000),
                full_page(2022, 2_000),
                full_page(2022, 3_000),
                vec![bill_record(4_000, "2022-12-01T09:00")],
            ],
        );
        let transport = api.into_transport();
        let mut source = source(transport.clone());

        let bills = source.collect(2022, 2022).await;

        assert_eq!(transport.request_count(), 4);
        assert_eq!(bills.len(), 301);
        let pages: Vec<String> = transport
            .requests()
            .iter()
            .map(|r| r.param("pagina").unwrap_or_default().to_string())
            .collect();
        assert_eq!(pages, vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_listing_query_parameters() {
        let transport = FakeApi::new().into_transport();
        let mut source = source(transport.clone());

        source.collect(2021, 2022).await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "http://api.test/v2/proposicoes");
        assert_eq!(requests[0].param("siglaTipo"), Some("PL"));
        assert_eq!(requests[0].param("dataApresentacaoInicio"), Some("2021-01-01"));
        assert_eq!(requests[0].param("dataApresentacaoFim"), Some("2021-12-31"));
        assert_eq!(requests[0].param("itens"), Some("100"));
        assert_eq!(requests[0].param("pagina"), Some("1"));
        assert_eq!(requests[1].param("dataApresentacaoInicio"), Some("2022-01-01"));
    }

    #[tokio::test]
    async fn test_empty_page_with_next_link_stops() {
        let transport = ScriptedTransport::new(|_, _| {
            Ok(json_response(json!({
                "dados": [],
                "links": [{"rel": "next", "href": "http://api.test/v2/proposicoes?pagina=2"}]
            })))
        });
        let mut source = source(transport.clone());

        let bills = source.collect(2020, 2020).await;

        assert!(bills.is_empty());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_bills_span_years_in_order() {
        let api = FakeApi::new()
            .year(2019, vec![vec![bill_record(1, "2019-02-01T10:00")]])
            .year(
                2020,
                vec![
                    vec![bill_record(2, "2020-01-05T10:00")],
                    vec![bill_record(3, "2020-07-20T10:00")],
                ],
            )
            .year(2021, vec![vec![bill_record(4, "2021-11-30T10:00")]]);
        let mut source = source(api.into_transport());

        let bills = source.collect(2019, 2021).await;

        let ids: Vec<u64> = bills.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        for bill in &bills {
            let year = bill.year.unwrap();
            assert!((2019..=2021).contains(&year));
        }
        assert_eq!(bills[2].year_month.as_deref(), Some("2020-07"));
    }

    #[tokio::test]
    async fn test_out_of_range_dates_dropped() {
        let api = FakeApi::new().year(
            2020,
            vec![vec![
                bill_record(1, "2020-06-01T10:00"),
                bill_record(2, "2019-12-31T10:00"),
                json!({"id": 3, "siglaTipo": "PL", "dataApresentacao": null}),
                json!({"siglaTipo": "PL", "dataApresentacao": "2020-06-01T10:00"}),
            ]],
        );
        let mut source = source(api.into_transport());

        let bills = source.collect(2020, 2020).await;

        let ids: Vec<u64> = bills.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(bills[1].year_month.is_none());
    }

    #[tokio::test]
    async fn test_page_pause_between_pages_only() {
        let api = FakeApi::new().year(
            2023,
            vec![
                vec![bill_record(1, "2023-01-01T10:00")],
                vec![bill_record(2, "2023-01-02T10:00")],
                vec![bill_record(3, "2023-01-03T10:00")],
            ],
        );
        let transport = api.into_transport();
        let mut source = source(transport);
        source.settings.page_delay = Duration::from_millis(150);

        source.collect(2023, 2023).await;

        assert_eq!(
            source.client().sleeper().slept(),
            vec![Duration::from_millis(150), Duration::from_millis(150)]
        );
    }

    #[tokio::test]
    async fn test_failed_page_skips_rest_of_year() {
        let transport = ScriptedTransport::new(|_, query| {
            let second_page = query.iter().any(|(k, v)| k == "pagina" && v == "2");
            if second_page {
                return Ok(status_response(404));
            }
            Ok(json_response(json!({
                "dados": [bill_record(101, "2020-05-05T10:00")],
                "links": [{"rel": "next", "href": "http://api.test/v2/proposicoes?pagina=2"}]
            })))
        });
        let mut source = source(transport.clone());

        let bills = source.collect(2020, 2020).await;

        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].id, 101);
        assert_eq!(transport.request_count(), 2);
        let warnings = source.client().take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("404"));
    }

    #[tokio::test]
    async fn test_failed_year_continues_with_next_year() {
        let api = FakeApi::new()
            .failing_year(2020)
            .year(2021, vec![vec![bill_record(7, "2021-04-01T10:00")]]);
        let transport = api.into_transport();
        let mut source = source(transport.clone());

        let bills = source.collect(2020, 2021).await;

        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].id, 7);
        assert_eq!(transport.request_count(), 2);
        assert_eq!(source.client().take_warnings().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_api_returns_empty_collection() {
        let transport = FakeApi::new().into_transport();
        let mut source = source(transport);

        let bills = source.collect(2018, 2020).await;

        assert!(bills.is_empty());
        assert!(source.client().take_warnings().is_empty());
    }

    #[tokio::test]
    async fn test_repeat_collect_served_from_cache() {
        let api = FakeApi::new().year(
            2024,
            vec![vec![
                bill_record(10, "2024-02-01T10:00"),
                bill_record(11, "2024-03-01T10:00"),
            ]],
        );
        let transport = api.into_transport();
        let mut source = source(transport.clone());

        let first = source.collect(2024, 2024).await;
        let requests_after_first = transport.request_count();
        let second = source.collect(2024, 2024).await;

        assert_eq!(first, second);
        assert_eq!(transport.request_count(), requests_after_first);
        assert_eq!(source.cache_stats().bill_queries, 1);
    }

    #[tokio::test]
    async fn test_partial_collection_not_cached() {
        let api = FakeApi::new().missing("/proposicoes");
        let transport = api.into_transport();
        let mut source = source(transport.clone());

        source.collect(2024, 2024).await;
        source.collect(2024, 2024).await;

        assert_eq!(transport.request_count(), 2);
        assert_eq!(source.cache_stats().bill_queries, 0);
    }
}
