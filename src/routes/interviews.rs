use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::interview_dto::{InterviewListQuery, ScheduleInterviewsPayload, UpdateInterviewPayload},
    error::Result,
    services::interview_service::ScheduleRequest,
    AppState,
};

#[axum::debug_handler]
pub async fn schedule_interviews(
    State(state): State<AppState>,
    Json(payload): Json<ScheduleInterviewsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let request = ScheduleRequest {
        application_ids: payload.application_ids,
        start_time: payload.scheduled_for,
        duration_minutes: payload
            .duration_minutes
            .unwrap_or(state.default_interview_minutes),
        meeting_url: payload.meeting_url,
        use_external_calendar: payload.use_google_calendar,
        send_notifications: payload.send_notification,
        scheduled_by: payload.scheduled_by,
    };
    let outcome = state.interview_service.schedule(request).await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

#[axum::debug_handler]
pub async fn list_interviews(
    State(state): State<AppState>,
    Query(query): Query<InterviewListQuery>,
) -> Result<impl IntoResponse> {
    let filter = query.into_filter();
    let interviews = state.interview_service.list_interviews(&filter).await?;
    Ok(Json(interviews))
}

#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let details = state.interview_service.get_interview(id).await?;
    Ok(Json(details))
}

#[axum::debug_handler]
pub async fn update_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let interview = state
        .interview_service
        .update_interview(id, payload.status, payload.notes)
        .await?;
    Ok(Json(interview))
}
