use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLC(V) price sample for a fixed time bucket. Timestamps are in
/// milliseconds. `o`, `h`, `l` and `c` are guaranteed finite after
/// normalization; volume is whatever the upstream reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub t: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<f64>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// The symbol resolved to zero upstream result entries. Distinct from an
    /// empty candle list, which just means "no data yet".
    #[error("no data found for symbol")]
    NotFound,
    #[error("chart provider returned status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("request timed out after {0}s")]
    TimedOut(u64),
}

/// Symbol-keyed price history capability.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn candles(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Vec<Candle>, FetchError>;
}

// --- Upstream Payload Shape ---

// The chart endpoint delivers parallel arrays: one list of second-resolution
// timestamps and per-field OHLCV lists of the same nominal length, any of
// which may be sparse (null entries) or absent entirely.

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize, Debug)]
pub struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Zips the parallel arrays into candle records, index by index. A record
/// missing a finite open, high, low or close is dropped; volume stays
/// optional. Timestamps are promoted from seconds to milliseconds. The order
/// is whatever the upstream delivered (ascending in practice).
fn normalize_candles(result: &ChartResult) -> Vec<Candle> {
    let quote = match result.indicators.quote.first() {
        Some(q) => q,
        None => return Vec::new(),
    };

    let finite = |field: &[Option<f64>], idx: usize| -> Option<f64> {
        field.get(idx).copied().flatten().filter(|v| v.is_finite())
    };

    result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(idx, ts)| {
            Some(Candle {
                t: ts * 1000,
                o: finite(&quote.open, idx)?,
                h: finite(&quote.high, idx)?,
                l: finite(&quote.low, idx)?,
                c: finite(&quote.close, idx)?,
                v: quote.volume.get(idx).copied().flatten(),
            })
        })
        .collect()
}

// --- Chart Provider Client ---

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

pub struct ChartClient {
    client: Client,
}

impl ChartClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriceSource for ChartClient {
    async fn candles(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = format!("{}/{}", CHART_URL, symbol);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("range", range),
                ("interval", interval),
                ("includePrePost", "false"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let data: ChartResponse = response.json().await?;
        let result = data
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or(FetchError::NotFound)?;

        Ok(normalize_candles(&result))
    }
}

/// Extracts the finite closing prices from a candle sequence, in order.
pub fn closing_prices(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.c).filter(|c| c.is_finite()).collect()
}
