use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::database::StoreError;
use crate::services::application_service::PipelineError;
use crate::services::interview_service::ScheduleError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) | StoreError::Constraint(_) => StatusCode::CONFLICT,
        StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        if let Error::Schedule(ScheduleError::Ineligible {
            invalid,
            ref application_ids,
        }) = self
        {
            let body = Json(json!({
                "error": self.to_string(),
                "invalid_count": invalid,
                "application_ids": application_ids,
            }));
            return (StatusCode::CONFLICT, body).into_response();
        }

        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Store(err) => {
                let status = store_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "storage failure");
                }
                (status, err.to_string())
            }
            Error::Schedule(ScheduleError::Store(err)) => {
                let status = store_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "storage failure while scheduling");
                }
                (status, err.to_string())
            }
            Error::Schedule(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Pipeline(PipelineError::Store(err)) => (store_status(&err), err.to_string()),
            Error::Pipeline(err @ PipelineError::Invalid(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Error::Pipeline(err @ PipelineError::IllegalTransition { .. }) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            Error::Pipeline(err) => (StatusCode::NOT_FOUND, err.to_string()),
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                format!("External service error: {}", err),
            ),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use uuid::Uuid;

    async fn render(err: Error) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn store_errors_map_by_kind() {
        let (status, body) = render(Error::Store(StoreError::Conflict("busy".into()))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());

        let (status, _) = render(Error::Store(StoreError::NotFound("gone".into()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ineligible_batch_reports_ids() {
        let id = Uuid::new_v4();
        let (status, body) = render(Error::Schedule(ScheduleError::Ineligible {
            invalid: 1,
            application_ids: vec![id],
        }))
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["invalid_count"], 1);
        assert_eq!(body["application_ids"][0], id.to_string());
    }

    #[tokio::test]
    async fn configuration_errors_are_opaque() {
        let (status, body) = render(Error::Config("GOOGLE_CLIENT_ID".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An unexpected error occurred");
    }
}
