//! Test doubles: a scripted transport, a recording sleeper, and a fake
//! open-data API built on top of them.

use crate::api::transport::{HttpResponse, Transport, TransportError};
use crate::api::{ApiClient, RetryPolicy};
use crate::pacing::Sleeper;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_BASE_URL: &str = "http://api.test/v2";

/// Sleeper that records requested durations and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.slept().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.slept.lock().unwrap().push(duration);
        std::future::ready(())
    }
}

/// One request seen by a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

type Handler =
    dyn Fn(&str, &[(String, String)]) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Transport that answers from a closure and logs every request.
#[derive(Clone)]
pub struct ScriptedTransport {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &[(String, String)]) -> Result<HttpResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Arc::new(handler),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer requests with `responses` in order, whatever the URL.
    pub fn sequence(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |_, _| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("script exhausted".to_string())))
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests whose URL ends with `suffix`.
    pub fn count_matching(&self, suffix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.ends_with(suffix))
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            query: query.to_vec(),
        });
        std::future::ready((self.handler)(url, query))
    }
}

impl HttpResponse {
    pub fn with_retry_after(mut self, seconds: &str) -> Self {
        self.retry_after = Some(seconds.to_string());
        self
    }
}

pub fn json_response(body: Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        retry_after: None,
        body: body.to_string(),
    }
}

pub fn status_response(status: u16) -> HttpResponse {
    HttpResponse {
        status,
        retry_after: None,
        body: format!("{{\"status\": {}}}", status),
    }
}

/// Client over `transport` with a recording sleeper and default retries.
pub fn test_client(transport: ScriptedTransport) -> ApiClient<ScriptedTransport, RecordingSleeper> {
    ApiClient::new(
        TEST_BASE_URL,
        transport,
        RecordingSleeper::default(),
        RetryPolicy::default(),
    )
}

/// Listing record for a PL presented on `date`.
pub fn bill_record(id: u64, date: &str) -> Value {
    json!({
        "id": id,
        "uri": format!("{}/proposicoes/{}", TEST_BASE_URL, id),
        "siglaTipo": "PL",
        "codTipo": 139,
        "numero": id % 10_000,
        "ano": date.get(..4).and_then(|y| y.parse::<i32>().ok()),
        "ementa": format!("Ementa do projeto {}", id),
        "dataApresentacao": date,
    })
}

/// In-memory stand-in for the Chamber of Deputies API.
#[derive(Debug, Clone, Default)]
pub struct FakeApi {
    /// Listing pages per year, in page order.
    pages: HashMap<i32, Vec<Vec<Value>>>,
    /// `dados` of `/proposicoes/{id}/autores`.
    authors: HashMap<u64, Vec<Value>>,
    /// Party code per legislator.
    parties: HashMap<u64, String>,
    /// Paths answered with a 404.
    missing: HashSet<String>,
    /// Years whose listing requests fail with a 400.
    failing_years: HashSet<i32>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the listing pages for a year. Every page but the last
    /// carries a `next` link.
    pub fn year(mut self, year: i32, pages: Vec<Vec<Value>>) -> Self {
        self.pages.insert(year, pages);
        self
    }

    pub fn authors(mut self, bill_id: u64, authors: Vec<Value>) -> Self {
        self.authors.insert(bill_id, authors);
        self
    }

    pub fn party(mut self, legislator_id: u64, party: &str) -> Self {
        self.parties.insert(legislator_id, party.to_string());
        self
    }

    /// Answer `path` (e.g. `/deputados/9`) with a 404.
    pub fn missing(mut self, path: &str) -> Self {
        self.missing.insert(path.to_string());
        self
    }

    pub fn failing_year(mut self, year: i32) -> Self {
        self.failing_years.insert(year);
        self
    }

    pub fn into_transport(self) -> ScriptedTransport {
        ScriptedTransport::new(move |url, query| Ok(self.respond(url, query)))
    }

    fn respond(&self, url: &str, query: &[(String, String)]) -> HttpResponse {
        let path = url.strip_prefix(TEST_BASE_URL).unwrap_or(url);
        if self.missing.contains(path) {
            return status_response(404);
        }

        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["proposicoes"] => self.listing(query),
            ["proposicoes", id, "autores"] => {
                let authors = id
                    .parse::<u64>()
                    .ok()
                    .and_then(|id| self.authors.get(&id))
                    .cloned()
                    .unwrap_or_default();
                json_response(json!({ "dados": authors }))
            }
            ["deputados", id] => match id.parse::<u64>().ok().and_then(|id| self.parties.get(&id)) {
                Some(party) => json_response(json!({
                    "dados": {"id": id, "ultimoStatus": {"siglaPartido": party}}
                })),
                None => status_response(404),
            },
            _ => status_response(404),
        }
    }

    fn listing(&self, query: &[(String, String)]) -> HttpResponse {
        let param = |name: &str| {
            query
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        let year: i32 = param("dataApresentacaoInicio")
            .get(..4)
            .and_then(|y| y.parse().ok())
            .unwrap_or_default();
        let page: usize = param("pagina").parse().unwrap_or(1);

        if self.failing_years.contains(&year) {
            return status_response(400);
        }

        let pages = self.pages.get(&year).cloned().unwrap_or_default();
        let records = pages.get(page.saturating_sub(1)).cloned().unwrap_or_default();

        let mut links = vec![json!({"rel": "self", "href": format!("{}/proposicoes?pagina={}", TEST_BASE_URL, page)})];
        if page < pages.len() {
            links.push(json!({
                "rel": "next",
                "href": format!("{}/proposicoes?pagina={}", TEST_BASE_URL, page + 1)
            }));
        }

        json_response(json!({ "dados": records, "links": links }))
    }
}
