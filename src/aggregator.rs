use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;

use crate::ai::Completion;
use crate::candles::{Candle, FetchError, PriceSource};
use crate::news::{Article, NewsSource};
use crate::social::{Post, SocialSource};
use crate::storage_utils::{CandleConfig, ProviderConfig};

/// Per-provider outcome wrapper. A failed fetch never crosses a fetcher
/// boundary as an error; it settles into `ok: false` so the remaining
/// sources still count.
#[derive(Debug, Clone, Serialize)]
pub struct SourceResult<T> {
    pub ok: bool,
    pub payload: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> SourceResult<T> {
    pub fn success(payload: T) -> Self {
        Self { ok: true, payload: Some(payload), error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { ok: false, payload: None, error: Some(error.into()) }
    }

    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(err) => Self::failure(err.to_string()),
        }
    }

    /// The payload of a successful fetch, if any.
    pub fn value(&self) -> Option<&T> {
        self.payload.as_ref()
    }
}

/// Everything the recommendation engine gets to see for one symbol. Built
/// fresh per request, discarded after the response.
#[derive(Debug, Serialize)]
pub struct AnalysisContext {
    pub symbol: String,
    pub price: SourceResult<Vec<Candle>>,
    pub news: SourceResult<Vec<Article>>,
    pub social: SourceResult<Vec<Post>>,
    pub auxiliary_analysis: SourceResult<String>,
}

/// The four upstream capabilities the aggregator fans out over.
pub struct Sources<'a> {
    pub price: &'a dyn PriceSource,
    pub news: &'a dyn NewsSource,
    pub social: &'a dyn SocialSource,
    pub completion: &'a dyn Completion,
}

const AUX_SYSTEM_PROMPT: &str =
    "Analyze market data and give a concise market assessment.";

fn aux_prompt(symbol: &str) -> String {
    format!("Give a quick analysis of {symbol} based on current market data and news.")
}

/// Issues all four source fetches concurrently and waits for every one of
/// them to settle. Any subset may fail; the context carries the failure
/// markers and the request proceeds. The one exception is a price fetch
/// that resolves to NotFound, which fails the request so callers can tell
/// an unknown symbol from a quiet one.
pub async fn gather(
    sources: &Sources<'_>,
    symbol: &str,
    candles: &CandleConfig,
    providers: &ProviderConfig,
) -> Result<AnalysisContext, FetchError> {
    let deadline = Duration::from_secs(providers.timeout_secs);

    let price_fut = async {
        match timeout(deadline, sources.price.candles(symbol, &candles.range, &candles.interval))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::TimedOut(providers.timeout_secs)),
        }
    };

    let news_fut = bounded(deadline, sources.news.search(symbol));
    let social_fut = bounded(deadline, sources.social.search(symbol));
    let aux_prompt_text = aux_prompt(symbol);
    let aux_fut = bounded(
        deadline,
        sources.completion.complete(
            AUX_SYSTEM_PROMPT,
            &aux_prompt_text,
            providers.max_tokens,
            providers.temperature,
        ),
    );

    let (price, news, social, aux) = futures::join!(price_fut, news_fut, social_fut, aux_fut);

    let price = match price {
        Err(FetchError::NotFound) => return Err(FetchError::NotFound),
        other => SourceResult::from_result(other),
    };
    if let Some(error) = &price.error {
        tracing::warn!(symbol, error = %error, "price source degraded");
    }

    Ok(AnalysisContext {
        symbol: symbol.to_string(),
        price,
        news: settled("news", symbol, news),
        social: settled("social", symbol, social),
        auxiliary_analysis: settled("auxiliary analysis", symbol, aux),
    })
}

async fn bounded<T>(
    deadline: Duration,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    match timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("timed out after {}s", deadline.as_secs()),
    }
}

fn settled<T>(source: &str, symbol: &str, result: anyhow::Result<T>) -> SourceResult<T> {
    if let Err(err) = &result {
        tracing::warn!(source, symbol, error = %err, "source degraded");
    }
    SourceResult::from_result(result.map_err(|err| format!("{err:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;

    struct StubPrice(Result<Vec<Candle>, &'static str>);

    #[async_trait]
    impl PriceSource for StubPrice {
        async fn candles(&self, _: &str, _: &str, _: &str) -> Result<Vec<Candle>, FetchError> {
            match &self.0 {
                Ok(candles) => Ok(candles.clone()),
                Err("not found") => Err(FetchError::NotFound),
                Err(_) => Err(FetchError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                )),
            }
        }
    }

    struct StubNews(bool);

    #[async_trait]
    impl NewsSource for StubNews {
        async fn search(&self, _: &str) -> anyhow::Result<Vec<Article>> {
            if self.0 {
                Ok(vec![])
            } else {
                bail!("news provider down")
            }
        }
    }

    struct StubSocial(bool);

    #[async_trait]
    impl SocialSource for StubSocial {
        async fn search(&self, _: &str) -> anyhow::Result<Vec<Post>> {
            if self.0 {
                Ok(vec![])
            } else {
                bail!("social provider down")
            }
        }
    }

    struct StubCompletion(bool);

    #[async_trait]
    impl Completion for StubCompletion {
        async fn complete(&self, _: &str, _: &str, _: u32, _: f64) -> anyhow::Result<String> {
            if self.0 {
                Ok("steady conditions".to_string())
            } else {
                bail!("quota exceeded")
            }
        }
    }

    struct SlowPrice;

    #[async_trait]
    impl PriceSource for SlowPrice {
        async fn candles(&self, _: &str, _: &str, _: &str) -> Result<Vec<Candle>, FetchError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(vec![])
        }
    }

    fn candle(t: i64, c: f64) -> Candle {
        Candle { t, o: c, h: c, l: c, c, v: None }
    }

    fn configs() -> (CandleConfig, ProviderConfig) {
        (
            CandleConfig { range: "1d".into(), interval: "1m".into() },
            ProviderConfig {
                timeout_secs: 5,
                recent_closes: 30,
                max_tokens: 150,
                temperature: 0.7,
                rsi_period: 14,
            },
        )
    }

    #[tokio::test]
    async fn all_sources_settle_into_the_context() {
        let price = StubPrice(Ok(vec![candle(0, 1.0), candle(1, 2.0)]));
        let sources = Sources {
            price: &price,
            news: &StubNews(true),
            social: &StubSocial(true),
            completion: &StubCompletion(true),
        };
        let (candles_cfg, providers) = configs();

        let ctx = gather(&sources, "AAPL", &candles_cfg, &providers).await.unwrap();
        assert!(ctx.price.ok);
        assert!(ctx.news.ok);
        assert!(ctx.social.ok);
        assert!(ctx.auxiliary_analysis.ok);
        assert_eq!(ctx.price.value().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn one_dead_provider_does_not_blank_the_rest() {
        let price = StubPrice(Err("server error"));
        let sources = Sources {
            price: &price,
            news: &StubNews(true),
            social: &StubSocial(false),
            completion: &StubCompletion(true),
        };
        let (candles_cfg, providers) = configs();

        let ctx = gather(&sources, "AAPL", &candles_cfg, &providers).await.unwrap();
        assert!(!ctx.price.ok);
        assert!(ctx.price.error.is_some());
        assert!(ctx.news.ok);
        assert!(!ctx.social.ok);
        assert!(ctx.auxiliary_analysis.ok);
    }

    #[tokio::test]
    async fn unknown_symbol_fails_the_whole_request() {
        let price = StubPrice(Err("not found"));
        let sources = Sources {
            price: &price,
            news: &StubNews(true),
            social: &StubSocial(true),
            completion: &StubCompletion(true),
        };
        let (candles_cfg, providers) = configs();

        let err = gather(&sources, "NOPE", &candles_cfg, &providers).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound));
    }

    #[tokio::test]
    async fn slow_source_is_bounded_by_the_timeout() {
        let sources = Sources {
            price: &SlowPrice,
            news: &StubNews(true),
            social: &StubSocial(true),
            completion: &StubCompletion(true),
        };
        let (candles_cfg, mut providers) = configs();
        providers.timeout_secs = 0;

        let ctx = gather(&sources, "AAPL", &candles_cfg, &providers).await.unwrap();
        assert!(!ctx.price.ok);
        assert!(ctx.price.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn empty_candle_list_is_success_not_failure() {
        let price = StubPrice(Ok(vec![]));
        let sources = Sources {
            price: &price,
            news: &StubNews(true),
            social: &StubSocial(true),
            completion: &StubCompletion(true),
        };
        let (candles_cfg, providers) = configs();

        let ctx = gather(&sources, "AAPL", &candles_cfg, &providers).await.unwrap();
        assert!(ctx.price.ok);
        assert!(ctx.price.value().unwrap().is_empty());
    }
}
