use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::aggregator::{AnalysisContext, Sources, gather};
use crate::candles::{FetchError, closing_prices};
use crate::indicators::relative_strength;
use crate::recommendation::{AiStrategy, HeuristicStrategy, Recommendation, recommend};
use crate::signals::{SignalSet, detect_signals};
use crate::storage_utils::AppConfig;

/// The composite answer for one symbol: raw per-source outcomes, derived
/// momentum markers, the RSI supplement and the final recommendation.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub context: AnalysisContext,
    pub signals: SignalSet,
    pub rsi: Option<f64>,
    pub recommendation: Recommendation,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid symbol {0:?}")]
    InvalidSymbol(String),
    #[error("no data found for {0}")]
    NotFound(String),
}

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Tickers, index symbols (^GSPC) and share classes (BRK-B, SAAB-B.ST).
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9.^-]{1,12}$").expect("symbol pattern"))
}

/// Runs the full analysis for one symbol: concurrent source fan-out,
/// signal detection over the normalized candles, and the two-tier
/// recommendation. Only a malformed symbol or an unknown one fail the
/// request; every degraded source is carried in the report instead.
pub async fn analyze(
    sources: &Sources<'_>,
    config: &AppConfig,
    symbol: &str,
) -> Result<AnalysisReport, AnalysisError> {
    let symbol = symbol.trim();
    if !symbol_pattern().is_match(symbol) {
        return Err(AnalysisError::InvalidSymbol(symbol.to_string()));
    }

    let context = gather(sources, symbol, &config.candles, &config.providers)
        .await
        .map_err(|err| match err {
            FetchError::NotFound => AnalysisError::NotFound(symbol.to_string()),
            // gather absorbs every other provider failure into the context.
            other => {
                tracing::error!(symbol, error = %other, "unexpected gather failure");
                AnalysisError::NotFound(symbol.to_string())
            }
        })?;

    let candles = context.price.value().map(Vec::as_slice).unwrap_or_default();
    let signals = detect_signals(candles, &config.signals);
    let rsi = relative_strength(&closing_prices(candles), config.providers.rsi_period);

    let ai = AiStrategy::new(sources.completion, &config.providers);
    let heuristic = HeuristicStrategy::new();
    let recommendation = recommend(&[&ai, &heuristic], &context).await;

    Ok(AnalysisReport {
        context,
        signals,
        rsi,
        recommendation,
    })
}
