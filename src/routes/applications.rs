use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{dto::application_dto::SubmitApplicationPayload, error::Result, AppState};

#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Json(payload): Json<SubmitApplicationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let application = state.application_service.submit_application(payload).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[axum::debug_handler]
pub async fn get_pipeline(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let entries = state.application_service.pipeline().await?;
    Ok(Json(entries))
}

#[axum::debug_handler]
pub async fn shortlist_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state.application_service.shortlist(id).await?;
    Ok(Json(application))
}

#[axum::debug_handler]
pub async fn reject_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state.application_service.reject(id).await?;
    Ok(Json(application))
}
