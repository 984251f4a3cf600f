pub mod applications;
pub mod candidates;
pub mod health;
pub mod interviews;
pub mod positions;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Recruitment API routes; the caller attaches state and layers.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/candidates/rankings", get(candidates::list_rankings))
        .route("/api/candidates/:id/ranking", get(candidates::get_ranking))
        .route("/api/positions", post(positions::create_position))
        .route(
            "/api/positions/:id/candidates",
            get(positions::get_position_candidates),
        )
        .route(
            "/api/positions/:id/analysis",
            get(positions::get_position_analysis),
        )
        .route("/api/applications", post(applications::submit_application))
        .route("/api/applications/pipeline", get(applications::get_pipeline))
        .route(
            "/api/applications/:id/shortlist",
            post(applications::shortlist_application),
        )
        .route(
            "/api/applications/:id/reject",
            post(applications::reject_application),
        )
        .route("/api/interviews", get(interviews::list_interviews))
        .route(
            "/api/interviews/schedule",
            post(interviews::schedule_interviews),
        )
        .route(
            "/api/interviews/:id",
            get(interviews::get_interview).patch(interviews::update_interview),
        )
}
