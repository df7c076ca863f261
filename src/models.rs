//! Data models for the bill statistics.
//!
//! This module contains the records rebuilt from API payloads (bills,
//! author references), the aggregated results, and the report structure.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Author-type prefixes that mark a parliamentary author.
const PARLIAMENTARY_PREFIXES: &[&str] = &["parlamentar", "parliamentary"];

/// A legislative proposal from the `/proposicoes` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    /// Unique proposal identifier.
    pub id: u64,
    /// Proposal type code (`siglaTipo`), e.g. "PL".
    pub type_code: String,
    /// Proposal number within its type and year.
    pub number: Option<u64>,
    /// Presentation date; `None` when absent or unparseable.
    pub presented_at: Option<DateTime<Utc>>,
    /// Free-text summary (`ementa`).
    pub summary: String,
    /// Year of the presentation date.
    pub year: Option<i32>,
    /// Calendar month of the presentation date, as `YYYY-MM`.
    pub year_month: Option<String>,
}

impl Bill {
    /// Build a bill from one listing record.
    ///
    /// Returns `None` when the record has no usable identifier. Every other
    /// field falls back to an empty or null value.
    pub fn from_json(json: &Value) -> Option<Self> {
        let id = json_id(&json["id"])?;
        let presented_at = json["dataApresentacao"]
            .as_str()
            .and_then(parse_presentation_date);

        Some(Self {
            id,
            type_code: json["siglaTipo"].as_str().unwrap_or("").to_string(),
            number: json_id(&json["numero"]),
            presented_at,
            summary: json["ementa"].as_str().unwrap_or("").trim().to_string(),
            year: presented_at.map(|d| d.year()),
            year_month: presented_at.map(|d| d.format("%Y-%m").to_string()),
        })
    }
}

/// Parse a presentation timestamp in any of the shapes the API emits.
///
/// Naive timestamps are read as UTC.
pub fn parse_presentation_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Read a positive integer identifier from a number or a numeric string.
///
/// Zero, null, and empty strings count as absent.
pub fn json_id(value: &Value) -> Option<u64> {
    let id = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;

    (id > 0).then_some(id)
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Raw records in the `dados` array.
    pub records: Vec<Value>,
    /// Whether the `links` array carries a `next` relation.
    pub has_next: bool,
}

impl ListingPage {
    pub fn from_json(json: &Value) -> Self {
        let records = json["dados"].as_array().cloned().unwrap_or_default();
        let has_next = json["links"]
            .as_array()
            .map(|links| links.iter().any(|l| l["rel"].as_str() == Some("next")))
            .unwrap_or(false);

        Self { records, has_next }
    }
}

/// Link between a bill and one of its proposers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    /// Author-type classification (`tipoAutor`).
    pub author_type: String,
    /// Legislator id from the top-level `idDeputado` field.
    pub deputy_id: Option<u64>,
    /// Legislator id from the nested `autor.id` field.
    pub nested_author_id: Option<u64>,
}

impl AuthorRef {
    pub fn from_json(json: &Value) -> Self {
        Self {
            author_type: json["tipoAutor"].as_str().unwrap_or("").to_string(),
            deputy_id: json_id(&json["idDeputado"]),
            nested_author_id: json_id(&json["autor"]["id"]),
        }
    }

    /// Whether the author type marks a member of parliament.
    pub fn is_parliamentary(&self) -> bool {
        let kind = self.author_type.trim().to_lowercase();
        PARLIAMENTARY_PREFIXES
            .iter()
            .any(|prefix| kind.starts_with(prefix))
    }

    /// Legislator id, checking `idDeputado` first and `autor.id` second.
    ///
    /// Upstream payloads are inconsistent about where the id lives, so both
    /// locations stay supported.
    pub fn legislator_id(&self) -> Option<u64> {
        self.deputy_id.or(self.nested_author_id)
    }
}

/// Extract the current party code from a `/deputados/{id}` payload.
///
/// Any missing or null level yields an empty string.
pub fn party_code_from_json(json: &Value) -> String {
    json["dados"]["ultimoStatus"]["siglaPartido"]
        .as_str()
        .unwrap_or("")
        .trim()
        .to_uppercase()
}

/// Number of parliamentary author occurrences for one party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyCount {
    /// Uppercase party code.
    pub party: String,
    /// Bill-author pairings resolved to this party.
    pub authors: usize,
}

/// Party tallies sorted by count, highest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyCounts(Vec<PartyCount>);

impl PartyCounts {
    /// Tally party codes, normalising to uppercase and skipping empty codes.
    ///
    /// Ties are ordered by party code so the output is stable.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tally: HashMap<String, usize> = HashMap::new();

        for code in codes {
            let code = code.as_ref().trim().to_uppercase();
            if !code.is_empty() {
                *tally.entry(code).or_default() += 1;
            }
        }

        let mut counts: Vec<PartyCount> = tally
            .into_iter()
            .map(|(party, authors)| PartyCount { party, authors })
            .collect();
        counts.sort_by(|a, b| b.authors.cmp(&a.authors).then_with(|| a.party.cmp(&b.party)));

        Self(counts)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Sum of all tallies.
    pub fn total(&self) -> usize {
        self.0.iter().map(|c| c.authors).sum()
    }

    /// Tally for one party code (case-insensitive).
    #[allow(dead_code)] // Lookup helper for library-style callers
    pub fn get(&self, party: &str) -> Option<usize> {
        let party = party.to_uppercase();
        self.0.iter().find(|c| c.party == party).map(|c| c.authors)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartyCount> {
        self.0.iter()
    }
}

/// Bills presented in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
    /// `YYYY-MM` bucket.
    pub year_month: String,
    pub bills: usize,
}

/// Row of the sample table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillPreview {
    pub id: u64,
    pub type_code: String,
    pub number: Option<u64>,
    pub year: Option<i32>,
    pub summary: String,
}

impl From<&Bill> for BillPreview {
    fn from(bill: &Bill) -> Self {
        Self {
            id: bill.id,
            type_code: bill.type_code.clone(),
            number: bill.number,
            year: bill.year,
            summary: bill.summary.clone(),
        }
    }
}

/// How the party chart was sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleMode {
    /// Only the first bills of the period.
    Sample,
    /// Every collected bill.
    All,
}

impl SampleMode {
    pub fn from_use_all(use_all: bool) -> Self {
        if use_all {
            SampleMode::All
        } else {
            SampleMode::Sample
        }
    }
}

impl fmt::Display for SampleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleMode::Sample => write!(f, "Sample"),
            SampleMode::All => write!(f, "All bills"),
        }
    }
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// API base URL the data was fetched from.
    pub source: String,
    /// First year of the period.
    pub start_year: i32,
    /// Last year of the period.
    pub end_year: i32,
    /// Whether all bills or a sample fed the party chart.
    pub sample_mode: SampleMode,
    /// Bills collected for the period.
    pub bills_collected: usize,
    /// Bills whose authors were resolved for the party chart.
    pub bills_sampled: usize,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete statistics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Bills per month, oldest first.
    pub monthly: Vec<MonthlyCount>,
    /// Parliamentary authors per party.
    pub parties: PartyCounts,
    /// First collected bills.
    pub preview: Vec<BillPreview>,
    /// Warnings raised while fetching data.
    pub warnings: Vec<String>,
}
