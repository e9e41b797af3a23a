//! Per-player anti-abuse gates: submission cooldown, daily quota, and
//! monotonic score progression.

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{ActivityRecord, Limits};
use crate::store::ScoreStore;
use crate::validate::PlayerName;
use crate::{Rejection, StoreError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied(Rejection),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progression {
    Valid,
    /// The stored best the submission failed to exceed.
    Beaten { best: i64 },
}

pub struct AbuseGuard {
    store: Arc<dyn ScoreStore>,
    clock: Arc<dyn Clock>,
    limits: Limits,
}

impl AbuseGuard {
    pub fn new(store: Arc<dyn ScoreStore>, clock: Arc<dyn Clock>, limits: Limits) -> Self {
        Self { store, clock, limits }
    }

    /// Cooldown gate, then quota gate. A denial leaves the activity record
    /// untouched, so rapid-fire retries keep comparing against the last
    /// accepted timestamp.
    pub async fn check_rate_limit(
        &self,
        name: &PlayerName,
        session_hint: Option<&str>,
    ) -> Result<RateDecision, StoreError> {
        let now = self.clock.now();

        let Some(mut activity) = self.store.find_activity(name).await? else {
            // First contact always passes; nothing to compare against.
            self.store
                .put_activity(ActivityRecord {
                    name: name.clone(),
                    last_submission_at: now,
                    submission_count: 1,
                    first_seen_at: now,
                    session_id: session_token(session_hint),
                })
                .await?;
            return Ok(RateDecision::Allowed);
        };

        if now - activity.last_submission_at < self.limits.cooldown {
            log::debug!("cooldown denial for {name}");
            return Ok(RateDecision::Denied(Rejection::CooldownActive));
        }

        // The counter never resets: once 24 h have passed since first
        // contact, this gate is permanently bypassed.
        let within_first_day = now - activity.first_seen_at < Duration::hours(24);
        if within_first_day && activity.submission_count >= self.limits.daily_quota {
            log::debug!("quota denial for {name}");
            return Ok(RateDecision::Denied(Rejection::QuotaExceeded));
        }

        activity.last_submission_at = now;
        activity.submission_count += 1;
        self.store.put_activity(activity).await?;
        Ok(RateDecision::Allowed)
    }

    /// A new score must strictly exceed the stored best, if any.
    pub async fn check_progression(
        &self,
        name: &PlayerName,
        new_score: i64,
    ) -> Result<Progression, StoreError> {
        match self.store.find_score(name).await? {
            Some(existing) if new_score <= existing.score => {
                Ok(Progression::Beaten { best: existing.score })
            }
            _ => Ok(Progression::Valid),
        }
    }
}

fn session_token(hint: Option<&str>) -> String {
    match hint {
        Some(token) if !token.trim().is_empty() => token.to_owned(),
        _ => Uuid::new_v4().to_string(),
    }
}
