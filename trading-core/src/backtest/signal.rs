// trading-core/src/backtest/signal.rs

use super::sma::MovingAverages;
use super::types::{ConfirmedSignal, RawSignal};
use serde::Serialize;

/// Raw regime per index plus the actions derived from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSeries {
    pub raw: Vec<Option<RawSignal>>,
    pub confirmed: Vec<ConfirmedSignal>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.confirmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }

    /// Degenerate series for a window pair that is not ordered short < long:
    /// every comparable index is `Flat` and nothing ever fires.
    pub fn always_flat(averages: &MovingAverages) -> Self {
        let raw: Vec<Option<RawSignal>> = averages
            .short
            .iter()
            .zip(averages.long.iter())
            .map(|(s, l)| (s.is_some() && l.is_some()).then_some(RawSignal::Flat))
            .collect();
        let confirmed = vec![ConfirmedSignal::Hold; raw.len()];

        Self { raw, confirmed }
    }

    /// Indices carrying a buy or sell action
    pub fn events(&self) -> impl Iterator<Item = (usize, ConfirmedSignal)> + '_ {
        self.confirmed
            .iter()
            .enumerate()
            .filter(|(_, signal)| !signal.is_hold())
            .map(|(i, signal)| (i, *signal))
    }
}

/// Classify one index. Equal averages count as `Flat`.
pub fn classify(short: Option<f64>, long: Option<f64>) -> Option<RawSignal> {
    match (short, long) {
        (Some(s), Some(l)) if s > l => Some(RawSignal::Long),
        (Some(_), Some(_)) => Some(RawSignal::Flat),
        _ => None,
    }
}

pub fn raw_signals(short_ma: &[Option<f64>], long_ma: &[Option<f64>]) -> Vec<Option<RawSignal>> {
    debug_assert_eq!(short_ma.len(), long_ma.len());
    short_ma
        .iter()
        .zip(long_ma.iter())
        .map(|(&s, &l)| classify(s, l))
        .collect()
}

/// Fire only where the regime changes between two available indices.
///
/// Index 0 is always `Hold`; so is any index whose own or preceding raw
/// signal is unavailable.
pub fn confirm(raw: &[Option<RawSignal>]) -> Vec<ConfirmedSignal> {
    let mut confirmed = Vec::with_capacity(raw.len());
    if raw.is_empty() {
        return confirmed;
    }

    confirmed.push(ConfirmedSignal::Hold);
    confirmed.extend(raw.windows(2).map(|pair| match (pair[0], pair[1]) {
        (Some(previous), Some(current)) if previous != current => current.into(),
        _ => ConfirmedSignal::Hold,
    }));

    confirmed
}

/// Act on every available raw signal without the change filter
pub fn passthrough(raw: &[Option<RawSignal>]) -> Vec<ConfirmedSignal> {
    raw.iter()
        .enumerate()
        .map(|(i, signal)| match signal {
            Some(signal) if i > 0 => (*signal).into(),
            _ => ConfirmedSignal::Hold,
        })
        .collect()
}

/// Turns a pair of moving averages into trading signals
#[derive(Debug, Clone, Copy)]
pub struct SignalGenerator {
    use_confirmation: bool,
}

impl SignalGenerator {
    pub fn new(use_confirmation: bool) -> Self {
        Self { use_confirmation }
    }

    pub fn generate(&self, short_ma: &[Option<f64>], long_ma: &[Option<f64>]) -> SignalSeries {
        let raw = raw_signals(short_ma, long_ma);
        let confirmed = if self.use_confirmation {
            confirm(&raw)
        } else {
            passthrough(&raw)
        };

        SignalSeries { raw, confirmed }
    }

    pub fn from_averages(&self, averages: &MovingAverages) -> SignalSeries {
        self.generate(&averages.short, &averages.long)
    }
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self::new(true)
    }
}
