use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;

use super::types::PriceSeries;

/// Identifies one fetched history: where it came from and which date range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub source: String,
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeriesKey {
    pub fn new(source: &str, symbol: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            source: source.to_string(),
            symbol: symbol.to_uppercase(),
            start,
            end,
        }
    }
}

struct CacheInner {
    entries: HashMap<SeriesKey, Arc<PriceSeries>>,
    order: VecDeque<SeriesKey>,
}

/// In-memory cache of fetched price histories for the lifetime of the process.
///
/// Re-running a backtest with different windows reuses the series instead of
/// refetching it. Oldest entries are evicted first once `capacity` is reached.
pub struct PriceSeriesCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

impl PriceSeriesCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub async fn get(&self, key: &SeriesKey) -> Option<Arc<PriceSeries>> {
        let inner = self.inner.read().await;
        let hit = inner.entries.get(key).cloned();
        debug!(
            "Series cache {} for {} [{} .. {}]",
            if hit.is_some() { "hit" } else { "miss" },
            key.symbol,
            key.start,
            key.end
        );
        hit
    }

    /// Store a series and hand back the shared handle
    pub async fn insert(&self, key: SeriesKey, series: PriceSeries) -> Arc<PriceSeries> {
        let series = Arc::new(series);
        let mut inner = self.inner.write().await;

        if inner.entries.insert(key.clone(), Arc::clone(&series)).is_none() {
            inner.order.push_back(key);
        }

        while inner.order.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                debug!("Evicting cached series for {}", evicted.symbol);
                inner.entries.remove(&evicted);
            }
        }

        series
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for PriceSeriesCache {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(symbol: &str) -> SeriesKey {
        SeriesKey::new(
            "synthetic",
            symbol,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = PriceSeriesCache::new(4);
        cache.insert(key("tsla"), PriceSeries::empty("TSLA")).await;

        let hit = cache.get(&key("TSLA")).await;
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().symbol(), "TSLA");
        assert!(cache.get(&key("AAPL")).await.is_none());
    }

    #[tokio::test]
    async fn test_evicts_oldest_entry() {
        let cache = PriceSeriesCache::new(2);
        cache.insert(key("A"), PriceSeries::empty("A")).await;
        cache.insert(key("B"), PriceSeries::empty("B")).await;
        cache.insert(key("C"), PriceSeries::empty("C")).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&key("A")).await.is_none());
        assert!(cache.get(&key("C")).await.is_some());
    }

    #[tokio::test]
    async fn test_reinsert_does_not_duplicate_order() {
        let cache = PriceSeriesCache::new(2);
        cache.insert(key("A"), PriceSeries::empty("A")).await;
        cache.insert(key("A"), PriceSeries::empty("A")).await;
        cache.insert(key("B"), PriceSeries::empty("B")).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&key("A")).await.is_some());
        assert!(!cache.is_empty().await);
    }
}
