use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user, per-lesson study state
///
/// At most one record exists per `(user_id, lesson_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub id: String,
    pub user_id: String,
    pub lesson_id: String,
    pub completed: bool,
    pub bookmarked: bool,
    /// Accumulated study time in minutes; never decreases
    pub study_time: i32,
    pub notes: Option<String>,
    /// Set once, on the first transition into `completed`
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
