//! Time-bounded cache in front of a creature source

use super::{CreatureDescriptor, CreatureSource, SourceError};
use crate::config::GameConfig;
use crate::metrics::SessionMetricsHandle;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CachedBatch {
    batch: Arc<Vec<CreatureDescriptor>>,
    fetched_at: Instant,
}

/// Caches successful batches by `(limit, offset)` for a fixed lifetime
///
/// Failed fetches are never cached.
pub struct CachedCreatureSource<S: CreatureSource> {
    inner: S,
    batches: RwLock<HashMap<(usize, usize), CachedBatch>>,
    ttl: Duration,
    metrics: SessionMetricsHandle,
}

impl<S: CreatureSource> CachedCreatureSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self::with_metrics(inner, ttl, SessionMetricsHandle::new())
    }

    /// Report hits and misses into an existing metrics handle
    pub fn with_metrics(inner: S, ttl: Duration, metrics: SessionMetricsHandle) -> Self {
        Self {
            inner,
            batches: RwLock::new(HashMap::new()),
            ttl,
            metrics,
        }
    }

    /// Cache for `config.creature_cache_ttl_secs`
    pub fn from_config(inner: S, config: &GameConfig, metrics: SessionMetricsHandle) -> Self {
        Self::with_metrics(inner, config.creature_cache_ttl(), metrics)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn metrics(&self) -> &SessionMetricsHandle {
        &self.metrics
    }

    /// Number of batches currently held, expired or not
    pub fn cached_batches(&self) -> usize {
        self.batches.read().len()
    }

    /// Drop every cached batch
    pub fn clear(&self) {
        self.batches.write().clear();
    }

    fn lookup(&self, key: (usize, usize)) -> Option<Arc<Vec<CreatureDescriptor>>> {
        let batches = self.batches.read();
        let cached = batches.get(&key)?;
        (cached.fetched_at.elapsed() < self.ttl).then(|| Arc::clone(&cached.batch))
    }
}

#[async_trait::async_trait]
impl<S: CreatureSource> CreatureSource for CachedCreatureSource<S> {
    async fn fetch_batch(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreatureDescriptor>, SourceError> {
        let key = (limit, offset);
        if let Some(batch) = self.lookup(key) {
            self.metrics.record_source_cache_hit();
            return Ok(batch.as_ref().clone());
        }
        self.metrics.record_source_cache_miss();

        let batch = self.inner.fetch_batch(limit, offset).await?;
        log::debug!(
            "Cached creature batch limit={limit} offset={offset} ({} entries)",
            batch.len()
        );
        self.batches.write().insert(
            key,
            CachedBatch {
                batch: Arc::new(batch.clone()),
                fetched_at: Instant::now(),
            },
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticCreatureSource;
    use futures::executor::block_on;

    fn catalogue() -> StaticCreatureSource {
        StaticCreatureSource::new(vec![
            CreatureDescriptor::new("1", "bulbasaur"),
            CreatureDescriptor::new("4", "charmander"),
            CreatureDescriptor::new("7", "squirtle"),
        ])
    }

    #[test]
    fn test_second_fetch_is_served_from_cache() {
        let cached = CachedCreatureSource::new(catalogue(), Duration::from_secs(60));

        let first = block_on(cached.fetch_batch(2, 0)).unwrap();
        let second = block_on(cached.fetch_batch(2, 0)).unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner().fetch_count(), 1);
        assert_eq!(cached.metrics().source_cache_hit_rate(), 50.0);
    }

    #[test]
    fn test_distinct_keys_are_cached_separately() {
        let cached = CachedCreatureSource::new(catalogue(), Duration::from_secs(60));
        block_on(cached.fetch_batch(2, 0)).unwrap();
        block_on(cached.fetch_batch(2, 1)).unwrap();
        assert_eq!(cached.cached_batches(), 2);
        assert_eq!(cached.inner().fetch_count(), 2);
    }

    #[test]
    fn test_expired_entries_are_refetched() {
        let cached = CachedCreatureSource::new(catalogue(), Duration::ZERO);
        block_on(cached.fetch_batch(3, 0)).unwrap();
        block_on(cached.fetch_batch(3, 0)).unwrap();
        assert_eq!(cached.inner().fetch_count(), 2);
    }

    #[test]
    fn test_ttl_comes_from_config() {
        let config = GameConfig {
            creature_cache_ttl_secs: 1,
            ..GameConfig::default()
        };
        let cached = CachedCreatureSource::from_config(
            Arc::new(catalogue()),
            &config,
            SessionMetricsHandle::new(),
        );
        assert_eq!(cached.ttl, Duration::from_secs(1));

        block_on(cached.fetch_batch(3, 0)).unwrap();
        block_on(cached.fetch_batch(3, 0)).unwrap();
        assert_eq!(cached.inner().fetch_count(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cached =
            CachedCreatureSource::new(StaticCreatureSource::unavailable(), Duration::from_secs(60));
        assert!(block_on(cached.fetch_batch(3, 0)).is_err());
        assert!(block_on(cached.fetch_batch(3, 0)).is_err());
        assert_eq!(cached.cached_batches(), 0);
        assert_eq!(cached.inner().fetch_count(), 2);
    }
}
