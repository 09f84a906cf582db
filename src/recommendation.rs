use async_trait::async_trait;
use serde::Serialize;

use crate::aggregator::AnalysisContext;
use crate::ai::Completion;
use crate::candles::closing_prices;
use crate::storage_utils::ProviderConfig;

/// Provenance of a recommendation: a model-backed answer or the
/// deterministic momentum fallback. Callers rely on this tag to tell the
/// two apart, so it always travels with the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Basis {
    Ai,
    Heuristic,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub text: String,
    pub basis: Basis,
}

/// One way of turning an analysis context into advice. Strategies are tried
/// in order; the first non-empty result wins.
#[async_trait]
pub trait Strategy: Send + Sync {
    async fn produce(&self, ctx: &AnalysisContext) -> Option<Recommendation>;
}

const FALLBACK_TEXT: &str = "No recommendation could be produced from the available data.";

/// Tries each strategy in order and returns the first non-empty
/// recommendation, falling back to a fixed string when every strategy
/// comes up blank.
pub async fn recommend(strategies: &[&dyn Strategy], ctx: &AnalysisContext) -> Recommendation {
    for strategy in strategies {
        if let Some(rec) = strategy.produce(ctx).await {
            if !rec.text.trim().is_empty() {
                return rec;
            }
        }
    }

    Recommendation {
        text: FALLBACK_TEXT.to_string(),
        basis: Basis::Heuristic,
    }
}

// --- AI Strategy ---

const AI_SYSTEM_PROMPT: &str = "You are a trading assistant that gives short, \
    clear recommendations based on price data.";

pub struct AiStrategy<'a> {
    completion: &'a dyn Completion,
    recent_closes: usize,
    max_tokens: u32,
    temperature: f64,
}

impl<'a> AiStrategy<'a> {
    pub fn new(completion: &'a dyn Completion, providers: &ProviderConfig) -> Self {
        Self {
            completion,
            recent_closes: providers.recent_closes,
            max_tokens: providers.max_tokens,
            temperature: providers.temperature,
        }
    }

    fn prompt(&self, ctx: &AnalysisContext, closes: &[f64]) -> String {
        // Only the tail of the series goes into the prompt; the full candle
        // history would burn tokens without changing the answer.
        let tail = &closes[closes.len().saturating_sub(self.recent_closes)..];
        let summary = tail
            .iter()
            .map(|c| format!("{c:.2}"))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Here are the latest closing prices for {}: {}. Based on this trend, \
             do you recommend buying, selling or waiting? Give a short rationale \
             and end with exactly one action: Buy, Sell or Hold.",
            ctx.symbol, summary
        )
    }
}

#[async_trait]
impl Strategy for AiStrategy<'_> {
    async fn produce(&self, ctx: &AnalysisContext) -> Option<Recommendation> {
        let closes = ctx.price.value().map(|c| closing_prices(c)).unwrap_or_default();
        if closes.is_empty() {
            return None;
        }

        // One attempt only. A quota or transport failure here means the
        // heuristic takes over, not a retry loop.
        match self
            .completion
            .complete(
                AI_SYSTEM_PROMPT,
                &self.prompt(ctx, &closes),
                self.max_tokens,
                self.temperature,
            )
            .await
        {
            Ok(text) if !text.trim().is_empty() => Some(Recommendation {
                text,
                basis: Basis::Ai,
            }),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(symbol = %ctx.symbol, error = %err, "ai strategy failed");
                None
            }
        }
    }
}

// --- Momentum Heuristic ---

// Percent change between the first and last close that separates a trend
// from sideways movement.
const TREND_THRESHOLD_PCT: f64 = 2.0;

const INSUFFICIENT_DATA_TEXT: &str =
    "Not enough price data to ground a recommendation.";

#[derive(Default)]
pub struct HeuristicStrategy;

impl HeuristicStrategy {
    pub fn new() -> Self {
        Self
    }

    fn advise(closes: &[f64]) -> String {
        let (Some(first), Some(last)) = (closes.first(), closes.last()) else {
            return INSUFFICIENT_DATA_TEXT.to_string();
        };
        if closes.len() < 2 || *first == 0.0 {
            return INSUFFICIENT_DATA_TEXT.to_string();
        }

        let change_pct = (last - first) / first * 100.0;
        if change_pct > TREND_THRESHOLD_PCT {
            format!(
                "Closing prices are up {change_pct:.2}% over the window, \
                 pointing to upward momentum. Buy."
            )
        } else if change_pct < -TREND_THRESHOLD_PCT {
            format!(
                "Closing prices are down {:.2}% over the window, \
                 pointing to downward momentum. Sell.",
                change_pct.abs()
            )
        } else {
            format!(
                "Closing prices moved {change_pct:.2}% over the window, \
                 trading sideways. Hold and wait for a clearer trend."
            )
        }
    }
}

#[async_trait]
impl Strategy for HeuristicStrategy {
    async fn produce(&self, ctx: &AnalysisContext) -> Option<Recommendation> {
        let closes = ctx.price.value().map(|c| closing_prices(c)).unwrap_or_default();
        Some(Recommendation {
            text: Self::advise(&closes),
            basis: Basis::Heuristic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::SourceResult;
    use crate::candles::Candle;
    use anyhow::bail;

    fn context_with_closes(closes: &[f64]) -> AnalysisContext {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle { t: i as i64, o: c, h: c, l: c, c, v: None })
            .collect();
        AnalysisContext {
            symbol: "TEST".to_string(),
            price: SourceResult::success(candles),
            news: SourceResult::failure("not configured"),
            social: SourceResult::failure("not configured"),
            auxiliary_analysis: SourceResult::failure("not configured"),
        }
    }

    struct CannedCompletion(Result<&'static str, &'static str>);

    #[async_trait]
    impl Completion for CannedCompletion {
        async fn complete(&self, _: &str, _: &str, _: u32, _: f64) -> anyhow::Result<String> {
            match self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => bail!("{msg}"),
            }
        }
    }

    fn providers() -> ProviderConfig {
        ProviderConfig {
            timeout_secs: 5,
            recent_closes: 30,
            max_tokens: 150,
            temperature: 0.7,
            rsi_period: 14,
        }
    }

    #[test]
    fn heuristic_reads_a_rise_as_buy() {
        // 50 -> 52 is +4%.
        let advice = HeuristicStrategy::advise(&[50.0, 52.0]);
        assert!(advice.contains("Buy"), "advice was: {advice}");
        assert!(advice.contains("4.00"));
    }

    #[test]
    fn heuristic_reads_a_drop_as_sell() {
        let advice = HeuristicStrategy::advise(&[50.0, 48.0]);
        assert!(advice.contains("Sell"), "advice was: {advice}");
    }

    #[test]
    fn heuristic_reads_flat_as_hold() {
        let advice = HeuristicStrategy::advise(&[50.0, 50.0]);
        assert!(advice.contains("Hold"), "advice was: {advice}");
    }

    #[test]
    fn heuristic_needs_two_closes_for_a_numeric_claim() {
        assert_eq!(HeuristicStrategy::advise(&[50.0]), INSUFFICIENT_DATA_TEXT);
        assert_eq!(HeuristicStrategy::advise(&[]), INSUFFICIENT_DATA_TEXT);
        // A zero first close would divide away; treated the same.
        assert_eq!(HeuristicStrategy::advise(&[0.0, 10.0]), INSUFFICIENT_DATA_TEXT);
    }

    #[tokio::test]
    async fn ai_answer_keeps_its_provenance() {
        let completion = CannedCompletion(Ok("Momentum looks strong. Buy."));
        let providers = providers();
        let ai = AiStrategy::new(&completion, &providers);
        let heuristic = HeuristicStrategy::new();
        let ctx = context_with_closes(&[50.0, 52.0]);

        let rec = recommend(&[&ai, &heuristic], &ctx).await;
        assert_eq!(rec.basis, Basis::Ai);
        assert!(rec.text.contains("Buy"));
    }

    #[tokio::test]
    async fn provider_failure_falls_through_to_the_heuristic() {
        let completion = CannedCompletion(Err("quota exceeded"));
        let providers = providers();
        let ai = AiStrategy::new(&completion, &providers);
        let heuristic = HeuristicStrategy::new();
        let ctx = context_with_closes(&[50.0, 52.0]);

        let rec = recommend(&[&ai, &heuristic], &ctx).await;
        assert_eq!(rec.basis, Basis::Heuristic);
        assert!(!rec.text.trim().is_empty());
        assert!(rec.text.contains("Buy"));
    }

    #[tokio::test]
    async fn empty_model_output_counts_as_failure() {
        let completion = CannedCompletion(Ok("   \n"));
        let providers = providers();
        let ai = AiStrategy::new(&completion, &providers);
        let heuristic = HeuristicStrategy::new();
        let ctx = context_with_closes(&[50.0, 48.0]);

        let rec = recommend(&[&ai, &heuristic], &ctx).await;
        assert_eq!(rec.basis, Basis::Heuristic);
        assert!(rec.text.contains("Sell"));
    }

    #[tokio::test]
    async fn engine_never_returns_an_empty_string() {
        // No price data at all and a dead model: the static fallback holds.
        let completion = CannedCompletion(Err("down"));
        let providers = providers();
        let ai = AiStrategy::new(&completion, &providers);
        let ctx = AnalysisContext {
            symbol: "TEST".to_string(),
            price: SourceResult::failure("provider down"),
            news: SourceResult::failure("not configured"),
            social: SourceResult::failure("not configured"),
            auxiliary_analysis: SourceResult::failure("not configured"),
        };

        let rec = recommend(&[&ai], &ctx).await;
        assert_eq!(rec.basis, Basis::Heuristic);
        assert_eq!(rec.text, FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn heuristic_covers_missing_price_payload() {
        let ctx = AnalysisContext {
            symbol: "TEST".to_string(),
            price: SourceResult::failure("provider down"),
            news: SourceResult::failure("not configured"),
            social: SourceResult::failure("not configured"),
            auxiliary_analysis: SourceResult::failure("not configured"),
        };
        let heuristic = HeuristicStrategy::new();

        let rec = recommend(&[&heuristic], &ctx).await;
        assert_eq!(rec.text, INSUFFICIENT_DATA_TEXT);
        assert_eq!(rec.basis, Basis::Heuristic);
    }
}
