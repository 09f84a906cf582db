use ta::Next;
use ta::indicators::RelativeStrengthIndex;

/// Latest RSI value over a run of closing prices, or None when there are
/// fewer closes than the period requires.
pub fn relative_strength(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period {
        return None;
    }

    let mut rsi = RelativeStrengthIndex::new(period).ok()?;

    let mut last = None;
    for &price in closes {
        last = Some(rsi.next(price));
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_closes_yield_none() {
        assert_eq!(relative_strength(&[100.0, 101.0], 14), None);
    }

    #[test]
    fn rising_series_scores_above_fifty() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rsi = relative_strength(&closes, 14).unwrap();
        assert!(rsi > 50.0, "rsi was {rsi}");
    }

    #[test]
    fn falling_series_scores_below_fifty() {
        let closes: Vec<f64> = (0..30).map(|i| 130.0 - i as f64).collect();
        let rsi = relative_strength(&closes, 14).unwrap();
        assert!(rsi < 50.0, "rsi was {rsi}");
    }
}
