use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::validate::{self, PlayerName};

/// A player's current best, one per case-folded name. Updated in place on
/// every accepted submission, never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScoreRecord {
    pub name: PlayerName,
    pub score: i64,
    #[serde(rename = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl ScoreRecord {
    /// Leaderboard order: score descending, ties broken by name ascending so
    /// results are deterministic across stores.
    pub fn leaderboard_order(a: &Self, b: &Self) -> std::cmp::Ordering {
        b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name))
    }
}

/// Per-player rate-limit bookkeeping. Lives independently of [`ScoreRecord`]:
/// no foreign key, no cascading delete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityRecord {
    pub name: PlayerName,
    /// Only advanced when the cooldown gate itself passes.
    pub last_submission_at: DateTime<Utc>,
    /// Attempts that passed the cooldown gate since `first_seen_at`.
    /// Never reset; see the quota gate in `guard`.
    pub submission_count: i32,
    /// First contact, immutable after creation.
    pub first_seen_at: DateTime<Utc>,
    /// Opaque session token, caller-supplied or generated.
    pub session_id: String,
}

/// Result of a rank lookup. `rank` is a dense 1-based row number over
/// (score desc, name asc); absent when the player holds no record.
/// `total_players` always reflects the full record count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub rank: Option<u64>,
    pub total_players: u64,
}

/// Confirmation of an accepted submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accepted {
    pub name: PlayerName,
    pub score: i64,
}

/// Tunable anti-abuse thresholds.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    /// Minimum gap between two accepted rate-limit checks for one player.
    pub cooldown: Duration,
    /// Attempts allowed within 24 h of a player's first contact.
    pub daily_quota: i32,
    /// Upper bound accepted by score validation.
    pub max_score: i64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            cooldown: Duration::milliseconds(30_000),
            daily_quota: 50,
            max_score: validate::MAX_PLAUSIBLE_SCORE,
        }
    }
}
