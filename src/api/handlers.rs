//! HTTP handlers for the ring lifecycle operations.

use super::errors::ApiError;
use super::AppState;
use crate::rings::synthetic;
use crate::rings::types::{Participant, RingFilter, RingSnapshot, RingStatus};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateRingRequest {
    pub creator_identity: String,
    #[serde(default)]
    pub display_label: Option<String>,
    pub buy_in: f64,
    pub max_participants: u32,
    #[serde(default)]
    pub is_demo: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateRingResponse {
    pub ring_id: Uuid,
    #[serde(flatten)]
    pub snapshot: RingSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct JoinRingRequest {
    pub identity: String,
    #[serde(default)]
    pub display_label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinRingResponse {
    pub participant_id: Uuid,
    pub participant: Participant,
}

#[derive(Debug, Deserialize)]
pub struct SpinRequest {
    pub requester_identity: String,
}

#[derive(Debug, Deserialize)]
pub struct ListRingsQuery {
    pub status: Option<RingStatus>,
    pub is_demo: Option<bool>,
}

/// Clients may omit a label; fall back to a shortened identity the way the
/// presentation layer shortens wallet addresses.
fn label_for(identity: &str, label: Option<String>) -> String {
    match label {
        Some(label) if !label.is_empty() => label,
        _ => {
            if identity.chars().count() > 8 {
                let short: String = identity.chars().take(8).collect();
                format!("{}…", short)
            } else {
                identity.to_string()
            }
        }
    }
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn create_ring_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRingRequest>,
) -> Result<Json<CreateRingResponse>, ApiError> {
    let label = label_for(&req.creator_identity, req.display_label.clone());
    let snapshot = state
        .engine
        .create_ring(
            &req.creator_identity,
            &label,
            req.buy_in,
            req.max_participants,
            req.is_demo,
        )
        .await?;

    if snapshot.ring.is_demo && state.demo.enabled {
        let _ = synthetic::spawn_filler(state.engine.clone(), snapshot.ring.id, state.demo.clone());
    }

    Ok(Json(CreateRingResponse {
        ring_id: snapshot.ring.id,
        snapshot,
    }))
}

pub async fn list_rings_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRingsQuery>,
) -> Result<Json<Vec<RingSnapshot>>, ApiError> {
    let filter = RingFilter {
        status: query.status,
        is_demo: query.is_demo,
    };
    Ok(Json(state.engine.list_rings(&filter).await?))
}

pub async fn get_ring_handler(
    State(state): State<Arc<AppState>>,
    Path(ring_id): Path<Uuid>,
) -> Result<Json<RingSnapshot>, ApiError> {
    Ok(Json(state.engine.get_ring(ring_id).await?))
}

pub async fn join_ring_handler(
    State(state): State<Arc<AppState>>,
    Path(ring_id): Path<Uuid>,
    Json(req): Json<JoinRingRequest>,
) -> Result<Json<JoinRingResponse>, ApiError> {
    let label = label_for(&req.identity, req.display_label.clone());
    let participant = state
        .engine
        .join_ring(ring_id, &req.identity, &label, false)
        .await?;

    Ok(Json(JoinRingResponse {
        participant_id: participant.id,
        participant,
    }))
}

pub async fn start_spin_handler(
    State(state): State<Arc<AppState>>,
    Path(ring_id): Path<Uuid>,
    Json(req): Json<SpinRequest>,
) -> Result<Json<RingSnapshot>, ApiError> {
    Ok(Json(
        state
            .engine
            .start_spin(ring_id, &req.requester_identity)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_falls_back_to_short_identity() {
        assert_eq!(label_for("alice", None), "alice");
        assert_eq!(
            label_for("0x1234567890abcdef", None),
            "0x123456…".to_string()
        );
        assert_eq!(
            label_for("0x1234567890abcdef", Some("Ace".to_string())),
            "Ace"
        );
        assert_eq!(label_for("bob", Some(String::new())), "bob");
    }
}
