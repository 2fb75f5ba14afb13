use crate::lifecycle::RegenerationReason;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one map session's spawn and capture activity
#[derive(Debug, Default)]
pub struct SessionMetrics {
    regenerations: RwLock<HashMap<RegenerationReason, u64>>,
    spawns_generated: AtomicU64,
    enters: AtomicU64,
    exits: AtomicU64,
    opportunities_opened: AtomicU64,
    captures_confirmed: AtomicU64,
    duplicate_acks: AtomicU64,
    stale_acks: AtomicU64,
    rewards_applied: AtomicU64,
    rewards_failed: AtomicU64,
    source_cache_hits: AtomicU64,
    source_cache_misses: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a full spawn set replacement
    pub fn record_regeneration(&self, reason: RegenerationReason, spawned: usize) {
        *self.regenerations.write().entry(reason).or_insert(0) += 1;
        self.spawns_generated
            .fetch_add(spawned as u64, Ordering::Relaxed);
    }

    pub fn record_enter(&self) {
        self.enters.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exit(&self) {
        self.exits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_opportunity(&self) {
        self.opportunities_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_capture(&self) {
        self.captures_confirmed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate_ack(&self) {
        self.duplicate_acks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_ack(&self) {
        self.stale_acks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reward_applied(&self) {
        self.rewards_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reward_failed(&self) {
        self.rewards_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_cache_hit(&self) {
        self.source_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_cache_miss(&self) {
        self.source_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Regenerations for one reason
    pub fn regenerations(&self, reason: RegenerationReason) -> u64 {
        *self.regenerations.read().get(&reason).unwrap_or(&0)
    }

    /// Regenerations for all reasons
    pub fn total_regenerations(&self) -> u64 {
        self.regenerations.read().values().sum()
    }

    pub fn spawns_generated(&self) -> u64 {
        self.spawns_generated.load(Ordering::Relaxed)
    }

    pub fn enters(&self) -> u64 {
        self.enters.load(Ordering::Relaxed)
    }

    pub fn exits(&self) -> u64 {
        self.exits.load(Ordering::Relaxed)
    }

    pub fn opportunities_opened(&self) -> u64 {
        self.opportunities_opened.load(Ordering::Relaxed)
    }

    pub fn captures_confirmed(&self) -> u64 {
        self.captures_confirmed.load(Ordering::Relaxed)
    }

    pub fn duplicate_acks(&self) -> u64 {
        self.duplicate_acks.load(Ordering::Relaxed)
    }

    pub fn stale_acks(&self) -> u64 {
        self.stale_acks.load(Ordering::Relaxed)
    }

    pub fn rewards_applied(&self) -> u64 {
        self.rewards_applied.load(Ordering::Relaxed)
    }

    pub fn rewards_failed(&self) -> u64 {
        self.rewards_failed.load(Ordering::Relaxed)
    }

    /// Creature source cache hit rate as a percentage
    pub fn source_cache_hit_rate(&self) -> f32 {
        let hits = self.source_cache_hits.load(Ordering::Relaxed) as f32;
        let misses = self.source_cache_misses.load(Ordering::Relaxed) as f32;

        if hits + misses > 0.0 {
            hits / (hits + misses) * 100.0
        } else {
            0.0
        }
    }
}

/// Shared handle to [`SessionMetrics`]
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsHandle(Arc<SessionMetrics>);

impl SessionMetricsHandle {
    pub fn new() -> Self {
        Self(Arc::new(SessionMetrics::new()))
    }

    pub fn inner(&self) -> &SessionMetrics {
        &self.0
    }
}

impl std::ops::Deref for SessionMetricsHandle {
    type Target = SessionMetrics;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
