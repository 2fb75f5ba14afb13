//! Player progression contract
//!
//! The core only needs two things from the progression store: read a user's
//! record and apply one capture reward to it. Implementations must apply the
//! reward as a single atomic step per user so concurrent captures never lose
//! an update or skip a level-up.

mod memory;

pub use crate::config::RewardPolicy;
pub use memory::{InMemoryLedger, StaticIdentity};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("No progression record for user {0}")]
    NotFound(UserId),

    #[error("Ledger write failed: {0}")]
    WriteFailed(String),
}

/// Identifier of a signed-in player
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-user level, experience and capture count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionRecord {
    pub level: u32,
    pub xp: u64,
    pub capture_count: u64,
}

impl Default for ProgressionRecord {
    /// The record every new account starts with
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            capture_count: 0,
        }
    }
}

impl RewardPolicy {
    /// Apply one capture reward to `record`
    ///
    /// Experience is cumulative and never reset on level-up; the level rises
    /// by one when the new total reaches `level * xp_per_level`.
    pub fn apply(&self, record: &ProgressionRecord) -> ProgressionRecord {
        let xp = record.xp.saturating_add(self.xp_per_capture);
        let threshold = u64::from(record.level).saturating_mul(self.xp_per_level);
        let level = if xp >= threshold {
            record.level.saturating_add(1)
        } else {
            record.level
        };

        ProgressionRecord {
            level,
            xp,
            capture_count: record.capture_count.saturating_add(1),
        }
    }
}

/// Store of progression records
#[async_trait::async_trait]
pub trait ProgressionLedger: Send + Sync {
    /// Read the current record for `user`
    async fn get_record(&self, user: &UserId) -> Result<ProgressionRecord, LedgerError>;

    /// Apply one capture reward atomically and return the updated record
    async fn apply_capture_reward(&self, user: &UserId) -> Result<ProgressionRecord, LedgerError>;
}

/// Source of the currently signed-in player
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}
