use serde::Serialize;

use crate::candles::Candle;
use crate::storage_utils::SignalConfig;

/// A buy or sell marker at a candle's timestamp and closing price. Which of
/// the two it is follows from the collection it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Signal {
    pub x: i64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SignalSet {
    pub buys: Vec<Signal>,
    pub sells: Vec<Signal>,
}

/// Walks adjacent candle pairs and marks a buy where the close rose more
/// than the buy threshold, a sell where it fell past the sell threshold.
///
/// Deliberately a one-step lookback: each marker depends only on the
/// immediately preceding close, with no smoothing or indicator window.
/// Sequences shorter than two candles produce no signals.
pub fn detect_signals(candles: &[Candle], config: &SignalConfig) -> SignalSet {
    let mut signals = SignalSet::default();

    for pair in candles.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if prev.c == 0.0 {
            continue;
        }

        let change = (cur.c - prev.c) / prev.c;
        if change > config.buy_threshold {
            signals.buys.push(Signal { x: cur.t, y: cur.c });
        } else if change < config.sell_threshold {
            signals.sells.push(Signal { x: cur.t, y: cur.c });
        }
    }

    signals
}
