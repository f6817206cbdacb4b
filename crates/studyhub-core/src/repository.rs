//! The storage capability contract
//!
//! Every backend (in-memory, SQLite, PostgreSQL) implements [`Repository`]
//! with identical semantics. Callers hold it as `Arc<dyn Repository>`,
//! chosen once at process start.
//!
//! Conventions shared by all implementations:
//! - lookups by id return `Ok(None)` when nothing matches;
//! - deletes return whether a row existed and cascade to every descendant;
//! - siblings are ordered by `order`, ties in insertion order;
//! - the public read paths hide unpublished lessons.

use std::sync::Arc;

use async_trait::async_trait;

use crate::commands::{
    ClassPatch, LessonPatch, MainTopicPatch, NewClass, NewLesson, NewMainTopic, NewUser,
    ProgressUpdate, UserPatch,
};
use crate::errors::Result;
use crate::model::{
    Class, ClassWithLessons, Lesson, LessonWithProgress, MainTopic, MainWithClasses, User,
    UserProgress,
};

/// Which lessons a read path may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Published lessons only (the public read path)
    #[default]
    Published,
    /// Drafts included; the caller has already decided the reader may see them
    All,
}

impl Visibility {
    pub fn admits(self, lesson: &Lesson) -> bool {
        match self {
            Visibility::Published => lesson.is_published,
            Visibility::All => true,
        }
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    // ===== Users =====

    async fn list_users(&self) -> Result<Vec<User>>;

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Exact, case-sensitive match on the stored email
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Raw insert; a duplicate email surfaces as `ConstraintViolation`
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>>;

    // ===== Main topics =====

    /// All main topics ordered by `order`, fully hydrated
    async fn list_mains(
        &self,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<MainWithClasses>>;

    async fn find_main(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<MainWithClasses>>;

    /// Public tree: published lessons, no progress
    async fn get_mains(&self) -> Result<Vec<MainWithClasses>> {
        self.list_mains(Visibility::Published, None).await
    }

    async fn get_main_by_id(&self, id: &str) -> Result<Option<MainWithClasses>> {
        self.find_main(id, Visibility::Published, None).await
    }

    async fn create_main(&self, main: NewMainTopic) -> Result<MainTopic>;

    async fn update_main(&self, id: &str, patch: MainTopicPatch) -> Result<Option<MainTopic>>;

    /// Removes the topic and, transitively, its classes, lessons and progress
    async fn delete_main(&self, id: &str) -> Result<bool>;

    // ===== Classes =====

    /// Top-level classes of a main topic, each with lessons and sub-classes
    async fn list_classes(
        &self,
        main_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<ClassWithLessons>>;

    async fn find_class(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<ClassWithLessons>>;

    async fn get_classes(&self, main_id: &str) -> Result<Vec<ClassWithLessons>> {
        self.list_classes(main_id, Visibility::Published, None).await
    }

    async fn get_class_by_id(&self, id: &str) -> Result<Option<ClassWithLessons>> {
        self.find_class(id, Visibility::Published, None).await
    }

    async fn create_class(&self, class: NewClass) -> Result<Class>;

    async fn update_class(&self, id: &str, patch: ClassPatch) -> Result<Option<Class>>;

    /// Removes the class, its sub-classes (transitively), their lessons and progress
    async fn delete_class(&self, id: &str) -> Result<bool>;

    // ===== Lessons =====

    async fn list_lessons(
        &self,
        class_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>>;

    /// Published lessons of a class, merged with `user_id`'s progress
    async fn get_lessons(
        &self,
        class_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        self.list_lessons(class_id, Visibility::Published, user_id)
            .await
    }

    /// Returns drafts too; callers check `is_published` themselves
    async fn get_lesson_by_id(
        &self,
        id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<LessonWithProgress>>;

    async fn create_lesson(&self, lesson: NewLesson) -> Result<Lesson>;

    /// Applies the patch and refreshes `updated_at`
    async fn update_lesson(&self, id: &str, patch: LessonPatch) -> Result<Option<Lesson>>;

    async fn delete_lesson(&self, id: &str) -> Result<bool>;

    /// Case-insensitive substring search over title, content, excerpt and
    /// reference of published lessons, newest first
    async fn search_lessons(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>>;

    // ===== Progress =====

    async fn get_user_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<UserProgress>>;

    /// Upsert keyed on `(user_id, lesson_id)`; see [`ProgressUpdate`]
    async fn update_user_progress(&self, update: ProgressUpdate) -> Result<UserProgress>;

    /// Published lessons the user bookmarked, most recently touched first
    async fn get_user_bookmarks(&self, user_id: &str) -> Result<Vec<LessonWithProgress>>;

    /// Published lessons the user completed, most recently completed first
    async fn get_user_completed_lessons(&self, user_id: &str)
        -> Result<Vec<LessonWithProgress>>;
}

/// A shared backend is itself a backend, so decorators can wrap the
/// `Arc<dyn Repository>` chosen at startup
#[async_trait]
impl<T: Repository + ?Sized> Repository for Arc<T> {
    async fn list_users(&self) -> Result<Vec<User>> {
        (**self).list_users().await
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        (**self).get_user_by_id(id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        (**self).get_user_by_email(email).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        (**self).create_user(user).await
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        (**self).update_user(id, patch).await
    }

    async fn list_mains(
        &self,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<MainWithClasses>> {
        (**self).list_mains(visibility, user_id).await
    }

    async fn find_main(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<MainWithClasses>> {
        (**self).find_main(id, visibility, user_id).await
    }

    async fn create_main(&self, main: NewMainTopic) -> Result<MainTopic> {
        (**self).create_main(main).await
    }

    async fn update_main(&self, id: &str, patch: MainTopicPatch) -> Result<Option<MainTopic>> {
        (**self).update_main(id, patch).await
    }

    async fn delete_main(&self, id: &str) -> Result<bool> {
        (**self).delete_main(id).await
    }

    async fn list_classes(
        &self,
        main_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<ClassWithLessons>> {
        (**self).list_classes(main_id, visibility, user_id).await
    }

    async fn find_class(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<ClassWithLessons>> {
        (**self).find_class(id, visibility, user_id).await
    }

    async fn create_class(&self, class: NewClass) -> Result<Class> {
        (**self).create_class(class).await
    }

    async fn update_class(&self, id: &str, patch: ClassPatch) -> Result<Option<Class>> {
        (**self).update_class(id, patch).await
    }

    async fn delete_class(&self, id: &str) -> Result<bool> {
        (**self).delete_class(id).await
    }

    async fn list_lessons(
        &self,
        class_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        (**self).list_lessons(class_id, visibility, user_id).await
    }

    async fn get_lesson_by_id(
        &self,
        id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<LessonWithProgress>> {
        (**self).get_lesson_by_id(id, user_id).await
    }

    async fn create_lesson(&self, lesson: NewLesson) -> Result<Lesson> {
        (**self).create_lesson(lesson).await
    }

    async fn update_lesson(&self, id: &str, patch: LessonPatch) -> Result<Option<Lesson>> {
        (**self).update_lesson(id, patch).await
    }

    async fn delete_lesson(&self, id: &str) -> Result<bool> {
        (**self).delete_lesson(id).await
    }

    async fn search_lessons(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        (**self).search_lessons(query, user_id).await
    }

    async fn get_user_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<UserProgress>> {
        (**self).get_user_progress(user_id, lesson_id).await
    }

    async fn update_user_progress(&self, update: ProgressUpdate) -> Result<UserProgress> {
        (**self).update_user_progress(update).await
    }

    async fn get_user_bookmarks(&self, user_id: &str) -> Result<Vec<LessonWithProgress>> {
        (**self).get_user_bookmarks(user_id).await
    }

    async fn get_user_completed_lessons(
        &self,
        user_id: &str,
    ) -> Result<Vec<LessonWithProgress>> {
        (**self).get_user_completed_lessons(user_id).await
    }
}
