//! Score backend core for the browser game: validation, anti-abuse gates,
//! and top-score ranking over an injected persistent store.
//!
//! The transport layer is deliberately absent here. It calls the three
//! operations on [`LeaderboardService`] and maps the typed results onto its
//! wire format; nothing in this crate knows about HTTP.

pub mod clock;
pub mod db;
pub mod guard;
pub mod models;
pub mod store;
pub mod validate;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::clock::Clock;
use crate::guard::{AbuseGuard, Progression, RateDecision};
use crate::models::{Accepted, Limits, ScoreRecord, Standing};
use crate::store::ScoreStore;
use crate::validate::PlayerName;

/// A domain rejection. Always recoverable by the caller; the `Display`
/// output is the user-facing message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("invalid name: use 3-16 letters, digits, or underscores")]
    InvalidName,
    #[error("invalid or suspicious score")]
    InvalidScore,
    #[error("cooldown active")]
    CooldownActive,
    #[error("daily quota exceeded")]
    QuotaExceeded,
    #[error("must exceed personal best of {best}")]
    NotPersonalBest { best: i64 },
}

/// Infrastructure fault from the persistent store. Propagated opaquely,
/// never retried here.
#[derive(Debug, Error)]
#[error("storage failure: {0}")]
pub struct StoreError(#[from] sea_orm::DbErr);

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates submission, top-N retrieval, and rank lookup.
///
/// Same-name submissions are serialized through a per-name mutex so the
/// read-check-write sequence cannot race against itself; different names
/// proceed concurrently.
pub struct LeaderboardService {
    store: Arc<dyn ScoreStore>,
    clock: Arc<dyn Clock>,
    guard: AbuseGuard,
    limits: Limits,
    locks: Mutex<HashMap<PlayerName, Arc<tokio::sync::Mutex<()>>>>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn ScoreStore>, clock: Arc<dyn Clock>, limits: Limits) -> Self {
        let guard = AbuseGuard::new(store.clone(), clock.clone(), limits);
        Self {
            store,
            clock,
            guard,
            limits,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Gates run in order and the first failure short-circuits: name format,
    /// score bounds, rate limit, progression. Rate-limit state is only
    /// touched for well-formed requests.
    pub async fn submit_score(
        &self,
        raw_name: &str,
        score: i64,
        session_hint: Option<&str>,
    ) -> Result<Accepted, SubmitError> {
        let Some(name) = PlayerName::parse(raw_name) else {
            return Err(Rejection::InvalidName.into());
        };
        if !validate::valid_score(score, self.limits.max_score) {
            return Err(Rejection::InvalidScore.into());
        }

        let lock = self.name_lock(&name);
        let _held = lock.lock().await;

        if let RateDecision::Denied(reason) = self.guard.check_rate_limit(&name, session_hint).await? {
            return Err(reason.into());
        }
        if let Progression::Beaten { best } = self.guard.check_progression(&name, score).await? {
            return Err(Rejection::NotPersonalBest { best }.into());
        }

        self.store
            .upsert_score(ScoreRecord {
                name: name.clone(),
                score,
                updated_at: self.clock.now(),
            })
            .await?;
        log::info!("accepted score {score} for {name}");
        Ok(Accepted { name, score })
    }

    pub async fn top_scores(&self, limit: u64) -> Result<Vec<ScoreRecord>, StoreError> {
        self.store.top_scores(limit).await
    }

    /// Rank lookup never rejects: a name that cannot hold a record simply
    /// has no rank, while `total_players` still reflects the full count.
    pub async fn rank(&self, raw_name: &str) -> Result<Standing, StoreError> {
        match PlayerName::parse(raw_name) {
            Some(name) => self.store.standing(&name).await,
            None => Ok(Standing {
                rank: None,
                total_players: self.store.player_count().await?,
            }),
        }
    }

    fn name_lock(&self, name: &PlayerName) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(name.clone()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn service() -> (LeaderboardService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::default());
        let service = LeaderboardService::new(store.clone(), clock, Limits::default());
        (service, store)
    }

    #[tokio::test]
    async fn malformed_name_burns_no_rate_limit_state() {
        let (service, store) = service();
        let err = service.submit_score("x", 10, None).await.unwrap_err();
        assert!(matches!(err, SubmitError::Rejected(Rejection::InvalidName)));
        assert_eq!(store.player_count().await.unwrap(), 0);
        assert!(
            store
                .find_activity(&PlayerName::parse("xyz").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn out_of_bounds_score_is_rejected_before_rate_limiting() {
        let (service, store) = service();
        for bad in [0, -3, validate::MAX_PLAUSIBLE_SCORE + 1] {
            let err = service.submit_score("abc", bad, None).await.unwrap_err();
            assert!(matches!(err, SubmitError::Rejected(Rejection::InvalidScore)));
        }
        // None of the rejected attempts created activity state.
        assert!(
            store
                .find_activity(&PlayerName::parse("abc").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn names_fold_to_one_identity() {
        let (service, _) = service();
        service.submit_score("  Abc ", 10, None).await.unwrap();

        // Different casing is the same player and hits the cooldown gate.
        let err = service.submit_score("ABC", 20, None).await.unwrap_err();
        assert!(matches!(err, SubmitError::Rejected(Rejection::CooldownActive)));

        let top = service.top_scores(10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name.as_str(), "abc");
    }
}
