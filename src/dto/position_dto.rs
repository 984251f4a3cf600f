use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::PositionStatus;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePositionPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub department: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: String,
    pub status: Option<PositionStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionAnalysisQuery {
    /// Second position to compare against.
    pub compare_with: Option<Uuid>,
}
