use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Symbol lookup capability.
#[async_trait]
pub trait SymbolSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<QuoteMatch>,
}

#[derive(Deserialize, Debug)]
struct QuoteMatch {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    longname: Option<String>,
    #[serde(default)]
    shortname: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

const SEARCH_URL: &str = "https://query1.finance.yahoo.com/v1/finance/search";

pub struct SearchClient {
    client: Client,
}

impl SearchClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SymbolSearch for SearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        let query = query.trim();
        if query.is_empty() {
            bail!("missing search query");
        }

        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query), ("quotesCount", "10"), ("newsCount", "0")])
            .send()
            .await
            .context("search request failed")?
            .error_for_status()
            .context("search provider rejected the request")?;

        let data: SearchResponse = response.json().await.context("invalid search payload")?;
        Ok(data.quotes.into_iter().filter_map(to_match).collect())
    }
}

/// Quotes without a symbol are useless and skipped; the display name falls
/// back through the long name, short name and bare symbol.
fn to_match(quote: QuoteMatch) -> Option<SymbolMatch> {
    let symbol = quote.symbol?;
    let name = quote
        .longname
        .or(quote.shortname)
        .or(quote.name)
        .unwrap_or_else(|| symbol.clone());
    Some(SymbolMatch { symbol, name })
}

// --- Stale-Response Guard ---

/// Monotonic generation counter for interactive search. When the query
/// changes before an earlier lookup resolves, the earlier result's
/// generation is stale and the result is dropped instead of being applied
/// over the newer one.
#[derive(Default)]
pub struct SearchSession {
    generation: AtomicU64,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a lookup tagged with a fresh generation. Returns None when a
    /// newer lookup started while this one was in flight.
    pub async fn search(
        &self,
        source: &dyn SymbolSearch,
        query: &str,
    ) -> Result<Option<Vec<SymbolMatch>>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let matches = source.search(query).await?;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(query, "discarding stale search result");
            return Ok(None);
        }
        Ok(Some(matches))
    }
}
