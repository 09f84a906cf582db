use futures::future::join_all;
use serde::Serialize;

use crate::candles::{PriceSource, closing_prices};
use crate::storage_utils::MoversConfig;

/// A symbol ranked by percent price change over the lookback window.
#[derive(Debug, Clone, Serialize)]
pub struct MoverEntry {
    pub symbol: String,
    pub change_pct: f64,
}

/// Fetches the lookback window for every symbol in the universe in
/// parallel and ranks by percent change between the first and last valid
/// close, descending. A symbol whose fetch fails or which has fewer than
/// two valid closes is excluded outright rather than reported as
/// zero-change, so failures cannot drag the ranking toward zero.
pub async fn top_movers(price: &dyn PriceSource, config: &MoversConfig) -> Vec<MoverEntry> {
    let fetches = config
        .universe
        .iter()
        .map(|symbol| rank_symbol(price, symbol, config));
    let mut entries: Vec<MoverEntry> = join_all(fetches).await.into_iter().flatten().collect();

    entries.sort_unstable_by(|a, b| {
        b.change_pct
            .partial_cmp(&a.change_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(config.top_n);
    entries
}

async fn rank_symbol(
    price: &dyn PriceSource,
    symbol: &str,
    config: &MoversConfig,
) -> Option<MoverEntry> {
    let candles = match price.candles(symbol, &config.range, &config.interval).await {
        Ok(candles) => candles,
        Err(err) => {
            tracing::debug!(symbol, error = %err, "excluded from ranking");
            return None;
        }
    };

    let closes = closing_prices(&candles);
    let (first, last) = match (closes.first(), closes.last()) {
        (Some(first), Some(last)) if closes.len() >= 2 && *first != 0.0 => (*first, *last),
        _ => return None,
    };

    Some(MoverEntry {
        symbol: symbol.to_string(),
        change_pct: (last - first) / first * 100.0,
    })
}
