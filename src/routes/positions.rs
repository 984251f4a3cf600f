use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::position_dto::{CreatePositionPayload, PositionAnalysisQuery},
    error::Result,
    services::position_analyzer::{analyze_position, compare_positions},
    AppState,
};

#[axum::debug_handler]
pub async fn create_position(
    State(state): State<AppState>,
    Json(payload): Json<CreatePositionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let position = state.application_service.create_position(payload).await?;
    Ok((StatusCode::CREATED, Json(position)))
}

#[axum::debug_handler]
pub async fn get_position_candidates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let evaluations = state
        .application_service
        .candidates_for_position(id)
        .await?;
    Ok(Json(evaluations))
}

#[axum::debug_handler]
pub async fn get_position_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PositionAnalysisQuery>,
) -> Result<impl IntoResponse> {
    let position = state.application_service.position(id).await?;
    let analysis = analyze_position(&position);

    let comparison = match query.compare_with {
        Some(other_id) => {
            let other = state.application_service.position(other_id).await?;
            Some(compare_positions(&position, &other))
        }
        None => None,
    };

    Ok(Json(json!({
        "position_id": position.id,
        "analysis": analysis,
        "comparison": comparison,
    })))
}
