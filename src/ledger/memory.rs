//! In-memory progression store

use super::{IdentityProvider, LedgerError, ProgressionLedger, ProgressionRecord, RewardPolicy, UserId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Progression ledger held in process memory
///
/// A single lock covers the read-check-increment of a reward, which makes
/// each reward atomic for the user it touches.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: Mutex<HashMap<UserId, ProgressionRecord>>,
    policy: RewardPolicy,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl InMemoryLedger {
    pub fn new(policy: RewardPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Create the starting record for a new account
    ///
    /// An existing record is left untouched and returned.
    pub fn register(&self, user: &UserId) -> ProgressionRecord {
        *self
            .records
            .lock()
            .entry(user.clone())
            .or_insert_with(ProgressionRecord::default)
    }

    /// Overwrite a user's record
    pub fn set_record(&self, user: &UserId, record: ProgressionRecord) {
        self.records.lock().insert(user.clone(), record);
    }

    /// Make subsequent reward writes fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of rewards successfully applied
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn policy(&self) -> RewardPolicy {
        self.policy
    }
}

#[async_trait::async_trait]
impl ProgressionLedger for InMemoryLedger {
    async fn get_record(&self, user: &UserId) -> Result<ProgressionRecord, LedgerError> {
        self.records
            .lock()
            .get(user)
            .copied()
            .ok_or_else(|| LedgerError::NotFound(user.clone()))
    }

    async fn apply_capture_reward(&self, user: &UserId) -> Result<ProgressionRecord, LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::WriteFailed(format!(
                "progression store rejected update for {user}"
            )));
        }

        let mut records = self.records.lock();
        let record = records
            .get_mut(user)
            .ok_or_else(|| LedgerError::NotFound(user.clone()))?;
        *record = self.policy.apply(record);
        self.writes.fetch_add(1, Ordering::Relaxed);

        log::debug!(
            "{user} now level {} with {} xp and {} captures",
            record.level,
            record.xp,
            record.capture_count
        );
        Ok(*record)
    }
}

/// Identity provider with a fixed answer
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn signed_in(user: UserId) -> Self {
        Self(Some(user))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.0.clone()
    }
}
