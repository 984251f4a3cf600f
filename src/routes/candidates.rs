use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{error::Result, AppState};

#[axum::debug_handler]
pub async fn list_rankings(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let ranked = state.ranking_service.rank_all().await?;
    Ok(Json(ranked))
}

#[axum::debug_handler]
pub async fn get_ranking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state.ranking_service.rank_candidate(id).await?;
    Ok(Json(detail))
}
