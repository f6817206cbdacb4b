use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Icon stored when a main topic is created without one
pub const DEFAULT_ICON: &str = "fas fa-book";

/// Top-level content grouping (a subject area)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainTopic {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Free-form icon identifier, rendered by the UI
    pub icon: Option<String>,
    /// Ascending sort key among all main topics
    pub order: i32,
    /// Creating user
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}
