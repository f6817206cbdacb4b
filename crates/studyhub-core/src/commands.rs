//! Insert payloads and partial-update patches
//!
//! Payloads arrive already validated by the caller. Patches are partial:
//! a `None` field is left untouched. Nullable columns use `Option<Option<T>>`
//! so that `Some(None)` clears the stored value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{timestamps, Class, Lesson, MainTopic, User, UserProgress, DEFAULT_ICON};

/// Generate a fresh entity id
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl NewUser {
    pub fn into_user(self, id: String, now: DateTime<Utc>) -> User {
        User {
            id,
            email: self.email,
            full_name: self.full_name,
            is_admin: self.is_admin,
            created_at: now,
        }
    }
}

/// Only the display name and admin flag of a user are mutable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub is_admin: Option<bool>,
}

impl UserPatch {
    pub fn apply_to(self, user: &mut User) {
        if let Some(full_name) = self.full_name {
            user.full_name = full_name;
        }
        if let Some(is_admin) = self.is_admin {
            user.is_admin = is_admin;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMainTopic {
    pub title: String,
    pub description: Option<String>,
    /// Falls back to [`DEFAULT_ICON`]
    pub icon: Option<String>,
    #[serde(default)]
    pub order: i32,
    pub created_by: String,
}

impl NewMainTopic {
    pub fn into_main(self, id: String, now: DateTime<Utc>) -> MainTopic {
        MainTopic {
            id,
            title: self.title,
            description: self.description,
            icon: Some(self.icon.unwrap_or_else(|| DEFAULT_ICON.to_string())),
            order: self.order,
            created_by: self.created_by,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainTopicPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub order: Option<i32>,
}

impl MainTopicPatch {
    pub fn apply_to(self, main: &mut MainTopic) {
        if let Some(title) = self.title {
            main.title = title;
        }
        if let Some(description) = self.description {
            main.description = description;
        }
        if let Some(icon) = self.icon {
            main.icon = icon;
        }
        if let Some(order) = self.order {
            main.order = order;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClass {
    pub title: String,
    pub description: Option<String>,
    pub main_id: String,
    pub parent_class_id: Option<String>,
    #[serde(default)]
    pub order: i32,
    pub created_by: String,
}

impl NewClass {
    pub fn into_class(self, id: String, now: DateTime<Utc>) -> Class {
        Class {
            id,
            title: self.title,
            description: self.description,
            main_id: self.main_id,
            parent_class_id: self.parent_class_id,
            order: self.order,
            created_by: self.created_by,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub main_id: Option<String>,
    pub parent_class_id: Option<Option<String>>,
    pub order: Option<i32>,
}

impl ClassPatch {
    pub fn apply_to(self, class: &mut Class) {
        if let Some(title) = self.title {
            class.title = title;
        }
        if let Some(description) = self.description {
            class.description = description;
        }
        if let Some(main_id) = self.main_id {
            class.main_id = main_id;
        }
        if let Some(parent_class_id) = self.parent_class_id {
            class.parent_class_id = parent_class_id;
        }
        if let Some(order) = self.order {
            class.order = order;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub bible_reference: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub duration: Option<i32>,
    pub class_id: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub is_published: bool,
    pub created_by: String,
}

impl NewLesson {
    pub fn into_lesson(self, id: String, now: DateTime<Utc>) -> Lesson {
        Lesson {
            id,
            title: self.title,
            content: self.content,
            excerpt: self.excerpt,
            bible_reference: self.bible_reference,
            image_url: self.image_url,
            audio_url: self.audio_url,
            duration: self.duration,
            class_id: self.class_id,
            order: self.order,
            is_published: self.is_published,
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub bible_reference: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub audio_url: Option<Option<String>>,
    pub duration: Option<Option<i32>>,
    pub class_id: Option<String>,
    pub order: Option<i32>,
    pub is_published: Option<bool>,
}

impl LessonPatch {
    /// Apply the patch and advance `updated_at`, even for an empty patch
    pub fn apply_to(self, lesson: &mut Lesson) {
        if let Some(title) = self.title {
            lesson.title = title;
        }
        if let Some(content) = self.content {
            lesson.content = content;
        }
        if let Some(excerpt) = self.excerpt {
            lesson.excerpt = excerpt;
        }
        if let Some(bible_reference) = self.bible_reference {
            lesson.bible_reference = bible_reference;
        }
        if let Some(image_url) = self.image_url {
            lesson.image_url = image_url;
        }
        if let Some(audio_url) = self.audio_url {
            lesson.audio_url = audio_url;
        }
        if let Some(duration) = self.duration {
            lesson.duration = duration;
        }
        if let Some(class_id) = self.class_id {
            lesson.class_id = class_id;
        }
        if let Some(order) = self.order {
            lesson.order = order;
        }
        if let Some(is_published) = self.is_published {
            lesson.is_published = is_published;
        }
        lesson.updated_at = timestamps::advance(lesson.updated_at);
    }
}

/// Upsert command for a `(user_id, lesson_id)` progress record
///
/// Unsupplied fields keep their stored value, or take the defaults
/// (`false`, `0`, no notes) when the record is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub user_id: String,
    pub lesson_id: String,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub bookmarked: Option<bool>,
    /// Accumulated total in minutes; a smaller value than the stored one is ignored
    #[serde(default)]
    pub study_time: Option<i32>,
    #[serde(default)]
    pub notes: Option<Option<String>>,
}

impl ProgressUpdate {
    pub fn new(user_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            lesson_id: lesson_id.into(),
            completed: None,
            bookmarked: None,
            study_time: None,
            notes: None,
        }
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn bookmarked(mut self, bookmarked: bool) -> Self {
        self.bookmarked = Some(bookmarked);
        self
    }

    pub fn study_time(mut self, minutes: i32) -> Self {
        self.study_time = Some(minutes);
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    /// True when this update moves the record into the completed state
    pub fn completes(&self) -> bool {
        self.completed == Some(true)
    }

    /// Build the record for a pair that has no progress yet
    pub fn into_new_record(self, id: String, now: DateTime<Utc>) -> UserProgress {
        let completes = self.completes();
        UserProgress {
            id,
            user_id: self.user_id,
            lesson_id: self.lesson_id,
            completed: self.completed.unwrap_or(false),
            bookmarked: self.bookmarked.unwrap_or(false),
            study_time: self.study_time.unwrap_or(0).max(0),
            notes: self.notes.flatten(),
            completed_at: completes.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge into an existing record
    ///
    /// `completed_at` is only set when it is still empty and this update
    /// completes the lesson; it is never cleared.
    pub fn merge_into(self, record: &mut UserProgress) {
        let updated_at = timestamps::advance(record.updated_at);
        if self.completes() && record.completed_at.is_none() {
            record.completed_at = Some(updated_at);
        }
        if let Some(completed) = self.completed {
            record.completed = completed;
        }
        if let Some(bookmarked) = self.bookmarked {
            record.bookmarked = bookmarked;
        }
        if let Some(study_time) = self.study_time {
            record.study_time = record.study_time.max(study_time);
        }
        if let Some(notes) = self.notes {
            record.notes = notes;
        }
        record.updated_at = updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_record() -> UserProgress {
        ProgressUpdate::new("u1", "l1").into_new_record(new_id(), timestamps::now())
    }

    #[test]
    fn test_new_record_defaults() {
        let record = fresh_record();
        assert!(!record.completed);
        assert!(!record.bookmarked);
        assert_eq!(record.study_time, 0);
        assert_eq!(record.notes, None);
        assert_eq!(record.completed_at, None);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_merge_keeps_unsupplied_fields() {
        let mut record = fresh_record();
        ProgressUpdate::new("u1", "l1")
            .bookmarked(true)
            .merge_into(&mut record);
        ProgressUpdate::new("u1", "l1")
            .completed(true)
            .merge_into(&mut record);

        assert!(record.bookmarked);
        assert!(record.completed);
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_completed_at_is_set_once() {
        let mut record = fresh_record();
        ProgressUpdate::new("u1", "l1")
            .completed(true)
            .merge_into(&mut record);
        let first = record.completed_at;

        ProgressUpdate::new("u1", "l1")
            .completed(false)
            .merge_into(&mut record);
        assert_eq!(record.completed_at, first);

        ProgressUpdate::new("u1", "l1")
            .completed(true)
            .merge_into(&mut record);
        assert_eq!(record.completed_at, first);
    }

    #[test]
    fn test_study_time_never_decreases() {
        let mut record = fresh_record();
        ProgressUpdate::new("u1", "l1")
            .study_time(30)
            .merge_into(&mut record);
        ProgressUpdate::new("u1", "l1")
            .study_time(10)
            .merge_into(&mut record);
        assert_eq!(record.study_time, 30);
    }

    #[test]
    fn test_notes_can_be_cleared() {
        let mut record = fresh_record();
        ProgressUpdate::new("u1", "l1")
            .notes(Some("Genesis 12".to_string()))
            .merge_into(&mut record);
        assert_eq!(record.notes.as_deref(), Some("Genesis 12"));

        ProgressUpdate::new("u1", "l1").merge_into(&mut record);
        assert_eq!(record.notes.as_deref(), Some("Genesis 12"));

        ProgressUpdate::new("u1", "l1")
            .notes(None)
            .merge_into(&mut record);
        assert_eq!(record.notes, None);
    }

    #[test]
    fn test_lesson_patch_advances_updated_at() {
        let now = timestamps::now();
        let mut lesson = NewLesson {
            title: "Abraham".to_string(),
            content: "<p>Faith</p>".to_string(),
            excerpt: None,
            bible_reference: None,
            image_url: None,
            audio_url: None,
            duration: None,
            class_id: "c1".to_string(),
            order: 0,
            is_published: false,
            created_by: "u1".to_string(),
        }
        .into_lesson(new_id(), now);

        LessonPatch::default().apply_to(&mut lesson);
        assert!(lesson.updated_at > now);
        assert_eq!(lesson.created_at, now);
    }

    #[test]
    fn test_main_defaults_icon() {
        let main = NewMainTopic {
            title: "Test".to_string(),
            description: None,
            icon: None,
            order: 0,
            created_by: "u1".to_string(),
        }
        .into_main(new_id(), timestamps::now());
        assert_eq!(main.icon.as_deref(), Some(DEFAULT_ICON));
    }

    #[test]
    fn test_main_patch_clears_description() {
        let mut main = NewMainTopic {
            title: "Test".to_string(),
            description: Some("desc".to_string()),
            icon: None,
            order: 0,
            created_by: "u1".to_string(),
        }
        .into_main(new_id(), timestamps::now());

        MainTopicPatch {
            description: Some(None),
            order: Some(4),
            ..Default::default()
        }
        .apply_to(&mut main);

        assert_eq!(main.description, None);
        assert_eq!(main.order, 4);
        assert_eq!(main.title, "Test");
    }
}
