use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single unit of publishable content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    /// Rich-text body (HTML as produced by the editor)
    pub content: String,
    pub excerpt: Option<String>,
    /// Scripture reference, e.g. "Genesis 12-22"
    pub bible_reference: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    /// Estimated study duration in minutes
    pub duration: Option<i32>,
    pub class_id: String,
    pub order: i32,
    /// Drafts are hidden from the public read paths
    pub is_published: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation
    pub updated_at: DateTime<Utc>,
}
