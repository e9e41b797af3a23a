//! HTTP surface over the leaderboard core: JSON envelope, status mapping,
//! nothing else.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use leaderboard::{
    Rejection, SubmitError,
    models::{ScoreRecord, Standing},
};

use crate::AppState;

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scores", post(submit_score).get(top_scores))
        .route("/scores/rank/:name", get(get_rank))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest {
    name: String,
    score: i64,
    session_id: Option<String>,
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> Envelope<T> {
    fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    fn message(text: String) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(text),
            error: None,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(text.into()),
        }
    }
}

fn status_for(reason: &Rejection) -> StatusCode {
    match reason {
        Rejection::InvalidName | Rejection::InvalidScore => StatusCode::BAD_REQUEST,
        Rejection::CooldownActive | Rejection::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
        Rejection::NotPersonalBest { .. } => StatusCode::CONFLICT,
    }
}

async fn submit_score(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitRequest>,
) -> (StatusCode, Json<Envelope<()>>) {
    match state
        .service
        .submit_score(&payload.name, payload.score, payload.session_id.as_deref())
        .await
    {
        Ok(accepted) => (
            StatusCode::OK,
            Json(Envelope::message(format!(
                "score {} recorded for {}",
                accepted.score, accepted.name
            ))),
        ),
        Err(SubmitError::Rejected(reason)) => {
            (status_for(&reason), Json(Envelope::error(reason.to_string())))
        }
        Err(SubmitError::Store(err)) => {
            log::error!("score submission failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::error("internal error")),
            )
        }
    }
}

#[derive(Deserialize)]
struct TopQuery {
    limit: Option<u64>,
}

async fn top_scores(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopQuery>,
) -> (StatusCode, Json<Envelope<Vec<ScoreRecord>>>) {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    match state.service.top_scores(limit).await {
        Ok(records) => (StatusCode::OK, Json(Envelope::data(records))),
        Err(err) => {
            log::error!("top scores lookup failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::error("internal error")),
            )
        }
    }
}

async fn get_rank(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<Envelope<Standing>>) {
    match state.service.rank(&name).await {
        Ok(standing) => (StatusCode::OK, Json(Envelope::data(standing))),
        Err(err) => {
            log::error!("rank lookup failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::error("internal error")),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaderboard::clock::SystemClock;
    use leaderboard::models::Limits;
    use leaderboard::store::MemoryStore;
    use leaderboard::LeaderboardService;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            service: LeaderboardService::new(
                Arc::new(MemoryStore::default()),
                Arc::new(SystemClock),
                Limits::default(),
            ),
        })
    }

    fn request(name: &str, score: i64) -> SubmitRequest {
        SubmitRequest {
            name: name.into(),
            score,
            session_id: None,
        }
    }

    #[tokio::test]
    async fn submit_rejects_malformed_name() {
        let state = state();
        let (status, Json(body)) =
            submit_score(State(state.clone()), Json(request("x", 10))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert!(body.error.unwrap().starts_with("invalid name"));

        let (_, Json(body)) =
            top_scores(State(state), Query(TopQuery { limit: None })).await;
        assert!(body.data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_then_read_back() {
        let state = state();
        let (status, Json(body)) =
            submit_score(State(state.clone()), Json(request("abc", 42))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert_eq!(body.message.unwrap(), "score 42 recorded for abc");

        let (status, Json(body)) =
            top_scores(State(state.clone()), Query(TopQuery { limit: None })).await;
        assert_eq!(status, StatusCode::OK);
        let records = body.data.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, 42);

        let (status, Json(body)) =
            get_rank(Path("abc".into()), State(state)).await;
        assert_eq!(status, StatusCode::OK);
        let standing = body.data.unwrap();
        assert_eq!(standing.rank, Some(1));
        assert_eq!(standing.total_players, 1);
    }

    #[tokio::test]
    async fn rapid_resubmission_maps_to_429() {
        let state = state();
        submit_score(State(state.clone()), Json(request("abc", 10))).await;
        let (status, Json(body)) =
            submit_score(State(state), Json(request("abc", 20))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.error.unwrap(), "cooldown active");
    }

    #[test]
    fn envelope_omits_absent_fields() {
        let body = serde_json::to_value(Envelope::<()>::error("nope")).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "error": "nope"}));

        let body = serde_json::to_value(Envelope::<()>::message("done".into())).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "message": "done"}));
    }

    #[test]
    fn standing_serializes_missing_rank_as_null() {
        let body = serde_json::to_value(Standing {
            rank: None,
            total_players: 3,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"rank": null, "totalPlayers": 3}));
    }

    #[tokio::test]
    async fn unknown_player_rank_is_null_with_full_count() {
        let state = state();
        submit_score(State(state.clone()), Json(request("abc", 10))).await;
        let (status, Json(body)) = get_rank(Path("ghost".into()), State(state)).await;
        assert_eq!(status, StatusCode::OK);
        let standing = body.data.unwrap();
        assert_eq!(standing.rank, None);
        assert_eq!(standing.total_players, 1);
    }
}
