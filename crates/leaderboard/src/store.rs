//! Persistent-store abstraction.
//!
//! The service takes the store as an injected `Arc<dyn ScoreStore>` so the
//! core stays testable against [`MemoryStore`]; the SQL-backed implementation
//! lives in [`crate::db`].

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::StoreError;
use crate::models::{ActivityRecord, ScoreRecord, Standing};
use crate::validate::PlayerName;

#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn find_score(&self, name: &PlayerName) -> Result<Option<ScoreRecord>, StoreError>;

    /// Insert-or-update keyed on name. Backends must make this a single
    /// atomic statement; the name's uniqueness constraint lives here.
    async fn upsert_score(&self, record: ScoreRecord) -> Result<(), StoreError>;

    /// All records ordered by score descending, name ascending, truncated
    /// to `limit`.
    async fn top_scores(&self, limit: u64) -> Result<Vec<ScoreRecord>, StoreError>;

    /// Dense 1-based rank of `name` within the leaderboard order, plus the
    /// total record count.
    async fn standing(&self, name: &PlayerName) -> Result<Standing, StoreError>;

    async fn player_count(&self) -> Result<u64, StoreError>;

    async fn find_activity(&self, name: &PlayerName) -> Result<Option<ActivityRecord>, StoreError>;

    /// Insert-or-update keyed on name. `first_seen_at` is immutable: on
    /// update, backends keep the stored value.
    async fn put_activity(&self, record: ActivityRecord) -> Result<(), StoreError>;
}

/// In-memory store for tests and for running without a database.
#[derive(Default)]
pub struct MemoryStore {
    scores: Mutex<HashMap<PlayerName, ScoreRecord>>,
    activity: Mutex<HashMap<PlayerName, ActivityRecord>>,
}

impl MemoryStore {
    fn ordered(scores: &HashMap<PlayerName, ScoreRecord>) -> Vec<ScoreRecord> {
        let mut records: Vec<ScoreRecord> = scores.values().cloned().collect();
        records.sort_by(ScoreRecord::leaderboard_order);
        records
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn find_score(&self, name: &PlayerName) -> Result<Option<ScoreRecord>, StoreError> {
        Ok(self.scores.lock().await.get(name).cloned())
    }

    async fn upsert_score(&self, record: ScoreRecord) -> Result<(), StoreError> {
        self.scores.lock().await.insert(record.name.clone(), record);
        Ok(())
    }

    async fn top_scores(&self, limit: u64) -> Result<Vec<ScoreRecord>, StoreError> {
        let scores = self.scores.lock().await;
        let mut records = Self::ordered(&scores);
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn standing(&self, name: &PlayerName) -> Result<Standing, StoreError> {
        let scores = self.scores.lock().await;
        let ordered = Self::ordered(&scores);
        let rank = ordered
            .iter()
            .position(|r| &r.name == name)
            .map(|i| i as u64 + 1);
        Ok(Standing {
            rank,
            total_players: ordered.len() as u64,
        })
    }

    async fn player_count(&self) -> Result<u64, StoreError> {
        Ok(self.scores.lock().await.len() as u64)
    }

    async fn find_activity(&self, name: &PlayerName) -> Result<Option<ActivityRecord>, StoreError> {
        Ok(self.activity.lock().await.get(name).cloned())
    }

    async fn put_activity(&self, record: ActivityRecord) -> Result<(), StoreError> {
        let mut activity = self.activity.lock().await;
        match activity.get_mut(&record.name) {
            Some(existing) => {
                let first_seen_at = existing.first_seen_at;
                *existing = record;
                existing.first_seen_at = first_seen_at;
            }
            None => {
                activity.insert(record.name.clone(), record);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn record(name: &str, score: i64) -> ScoreRecord {
        ScoreRecord {
            name: PlayerName::parse(name).unwrap(),
            score,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn top_scores_orders_and_truncates() {
        let store = MemoryStore::default();
        store.upsert_score(record("low", 5)).await.unwrap();
        store.upsert_score(record("high", 50)).await.unwrap();
        store.upsert_score(record("mid", 20)).await.unwrap();

        let top = store.top_scores(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name.as_str(), "high");
        assert_eq!(top[1].name.as_str(), "mid");
    }

    #[tokio::test]
    async fn ties_break_by_name() {
        let store = MemoryStore::default();
        store.upsert_score(record("zed", 10)).await.unwrap();
        store.upsert_score(record("amy", 10)).await.unwrap();

        let top = store.top_scores(10).await.unwrap();
        assert_eq!(top[0].name.as_str(), "amy");
        assert_eq!(top[1].name.as_str(), "zed");

        let standing = store
            .standing(&PlayerName::parse("zed").unwrap())
            .await
            .unwrap();
        assert_eq!(standing.rank, Some(2));
    }

    #[tokio::test]
    async fn put_activity_preserves_first_seen() {
        let store = MemoryStore::default();
        let name = PlayerName::parse("abc").unwrap();
        let first = Utc::now();
        store
            .put_activity(ActivityRecord {
                name: name.clone(),
                last_submission_at: first,
                submission_count: 1,
                first_seen_at: first,
                session_id: "s1".into(),
            })
            .await
            .unwrap();

        let later = first + chrono::Duration::minutes(5);
        store
            .put_activity(ActivityRecord {
                name: name.clone(),
                last_submission_at: later,
                submission_count: 2,
                first_seen_at: later,
                session_id: "s1".into(),
            })
            .await
            .unwrap();

        let stored = store.find_activity(&name).await.unwrap().unwrap();
        assert_eq!(stored.first_seen_at, first);
        assert_eq!(stored.submission_count, 2);
        assert_eq!(stored.last_submission_at, later);
    }
}
