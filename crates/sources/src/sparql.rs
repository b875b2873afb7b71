//! SPARQL reference sources (LINDAS, Wikidata).
//!
//! Protocol: SPARQL 1.1 query over HTTP, results in SPARQL-JSON
//! (`results.bindings[].<variable>.value`).

use std::time::Duration;

use communecheck_recon::{MatchField, QueryMethod, ReferenceCodes, SourceConfig};

use crate::client::{FetchClient, FetchError};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Rejected identifiers echoed in the warning line.
const REJECTED_SAMPLE: usize = 5;

/// A source of codes to reconcile the registry against.
pub trait ReferenceSource {
    fn name(&self) -> &str;

    /// Registry column this source's codes correspond to.
    fn match_on(&self) -> MatchField {
        MatchField::HistoricalCode
    }

    fn fetch(&self) -> Result<ReferenceCodes, FetchError>;
}

pub struct SparqlSource {
    client: FetchClient,
    config: SourceConfig,
}

impl SparqlSource {
    pub fn new(config: SourceConfig, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: FetchClient::new(&config.name, timeout)?,
            config,
        })
    }
}

impl ReferenceSource for SparqlSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn match_on(&self) -> MatchField {
        self.config.match_on
    }

    fn fetch(&self) -> Result<ReferenceCodes, FetchError> {
        log::info!("querying {} at {}", self.config.name, self.config.endpoint);

        let query = self.config.query.as_str();
        let body = self.client.send_json(|http| {
            let req = match self.config.method {
                QueryMethod::Get => http.get(&self.config.endpoint).query(&[("query", query)]),
                QueryMethod::Post => http.post(&self.config.endpoint).form(&[("query", query)]),
            };
            req.header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
        })?;

        let codes = parse_bindings(&body, &self.config.variable)
            .map_err(|msg| FetchError::Parse(format!("{}: {}", self.config.name, msg)))?;

        if !codes.rejected.is_empty() {
            let sample: Vec<&str> = codes
                .rejected
                .iter()
                .take(REJECTED_SAMPLE)
                .map(|s| s.as_str())
                .collect();
            log::warn!(
                "{}: ignored {} identifier(s) that are not codes, e.g. {:?}",
                self.config.name,
                codes.rejected.len(),
                sample,
            );
        }
        log::info!("{} returned {} codes", self.config.name, codes.len());

        Ok(codes)
    }
}

/// Collect the codes bound to `variable` in a SPARQL-JSON result document.
///
/// Rows where the variable is unbound, null or not coercible to a code are
/// recorded in `rejected` and otherwise ignored.
pub fn parse_bindings(body: &serde_json::Value, variable: &str) -> Result<ReferenceCodes, String> {
    let bindings = body["results"]["bindings"]
        .as_array()
        .ok_or_else(|| "response missing 'results.bindings' array".to_string())?;

    let mut codes = ReferenceCodes::default();
    for binding in bindings {
        let value = &binding[variable]["value"];
        match coerce_code(value) {
            Some(code) => {
                codes.codes.insert(code);
            }
            None => codes.rejected.push(display_value(value)),
        }
    }
    Ok(codes)
}

/// Coerce an identifier to a code: decimal integers (leading zeros allowed)
/// and integral decimals such as `"261.0"`, as strings or JSON numbers.
pub fn coerce_code(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::String(s) => coerce_str(s),
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| n.as_f64().and_then(integral_f64)),
        _ => None,
    }
}

fn coerce_str(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok();
    }
    let (whole, frac) = s.split_once('.')?;
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b == b'0') {
        return None;
    }
    whole.parse().ok()
}

fn integral_f64(v: f64) -> Option<u32> {
    if v.is_finite() && v.fract() == 0.0 && v >= 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "<unbound>".to_string(),
        other => other.to_string(),
    }
}
