use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered platform user
///
/// Emails are compared exactly (case-sensitive, no normalisation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}
