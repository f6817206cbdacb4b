//! Logging decorator for any [`Repository`]
//!
//! Each call emits `start`, then `end` (with `duration_ms` and, for
//! collections, `result_len`) or `end_error` (with `err_kind` and
//! `err_code`). Emails are masked; notes are never logged.

use std::future::Future;
use std::time::Instant;

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
use crate::repository::{Repository, Visibility};
use crate::studyhub_core_types::MaskedEmail;
use crate::{log_op_end, log_op_error, log_op_start};

/// Size reported as `result_len` on the `end` event
pub trait ResultLen {
    fn result_len(&self) -> Option<usize> {
        None
    }
}

impl<T> ResultLen for Vec<T> {
    fn result_len(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T> ResultLen for Option<T> {
    fn result_len(&self) -> Option<usize> {
        Some(usize::from(self.is_some()))
    }
}

impl ResultLen for bool {}
impl ResultLen for User {}
impl ResultLen for MainTopic {}
impl ResultLen for Class {}
impl ResultLen for Lesson {}
impl ResultLen for UserProgress {}

async fn timed<T, F>(op: &'static str, call: F) -> Result<T>
where
    T: ResultLen,
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = call.await;
    let duration_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(value) => match value.result_len() {
            Some(len) => {
                log_op_end!(op, duration_ms = duration_ms, result_len = len);
            }
            None => {
                log_op_end!(op, duration_ms = duration_ms);
            }
        },
        Err(err) => {
            log_op_error!(op, err.clone(), duration_ms = duration_ms);
        }
    }
    result
}

/// Wraps a backend and logs every call
#[derive(Debug)]
pub struct LoggedRepository<R> {
    inner: R,
}

impl<R: Repository> LoggedRepository<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: Repository> Repository for LoggedRepository<R> {
    async fn list_users(&self) -> Result<Vec<User>> {
        log_op_start!("list_users");
        timed("list_users", self.inner.list_users()).await
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        log_op_start!("get_user_by_id", user_id = id);
        timed("get_user_by_id", self.inner.get_user_by_id(id)).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        log_op_start!("get_user_by_email", email = %MaskedEmail::new(email));
        timed("get_user_by_email", self.inner.get_user_by_email(email)).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        log_op_start!("create_user", email = %MaskedEmail::new(&user.email));
        timed("create_user", self.inner.create_user(user)).await
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        log_op_start!("update_user", user_id = id);
        timed("update_user", self.inner.update_user(id, patch)).await
    }

    async fn list_mains(
        &self,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<MainWithClasses>> {
        log_op_start!("list_mains", visibility = ?visibility, user_id = user_id);
        timed("list_mains", self.inner.list_mains(visibility, user_id)).await
    }

    async fn find_main(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<MainWithClasses>> {
        log_op_start!("find_main", main_id = id, visibility = ?visibility, user_id = user_id);
        timed("find_main", self.inner.find_main(id, visibility, user_id)).await
    }

    async fn create_main(&self, main: NewMainTopic) -> Result<MainTopic> {
        log_op_start!("create_main");
        timed("create_main", self.inner.create_main(main)).await
    }

    async fn update_main(&self, id: &str, patch: MainTopicPatch) -> Result<Option<MainTopic>> {
        log_op_start!("update_main", main_id = id);
        timed("update_main", self.inner.update_main(id, patch)).await
    }

    async fn delete_main(&self, id: &str) -> Result<bool> {
        log_op_start!("delete_main", main_id = id);
        timed("delete_main", self.inner.delete_main(id)).await
    }

    async fn list_classes(
        &self,
        main_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<ClassWithLessons>> {
        log_op_start!("list_classes", main_id = main_id, visibility = ?visibility, user_id = user_id);
        timed(
            "list_classes",
            self.inner.list_classes(main_id, visibility, user_id),
        )
        .await
    }

    async fn find_class(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<ClassWithLessons>> {
        log_op_start!("find_class", class_id = id, visibility = ?visibility, user_id = user_id);
        timed("find_class", self.inner.find_class(id, visibility, user_id)).await
    }

    async fn create_class(&self, class: NewClass) -> Result<Class> {
        log_op_start!("create_class", main_id = class.main_id.as_str());
        timed("create_class", self.inner.create_class(class)).await
    }

    async fn update_class(&self, id: &str, patch: ClassPatch) -> Result<Option<Class>> {
        log_op_start!("update_class", class_id = id);
        timed("update_class", self.inner.update_class(id, patch)).await
    }

    async fn delete_class(&self, id: &str) -> Result<bool> {
        log_op_start!("delete_class", class_id = id);
        timed("delete_class", self.inner.delete_class(id)).await
    }

    async fn list_lessons(
        &self,
        class_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        log_op_start!("list_lessons", class_id = class_id, visibility = ?visibility, user_id = user_id);
        timed(
            "list_lessons",
            self.inner.list_lessons(class_id, visibility, user_id),
        )
        .await
    }

    async fn get_lesson_by_id(
        &self,
        id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<LessonWithProgress>> {
        log_op_start!("get_lesson_by_id", lesson_id = id, user_id = user_id);
        timed("get_lesson_by_id", self.inner.get_lesson_by_id(id, user_id)).await
    }

    async fn create_lesson(&self, lesson: NewLesson) -> Result<Lesson> {
        log_op_start!("create_lesson", class_id = lesson.class_id.as_str());
        timed("create_lesson", self.inner.create_lesson(lesson)).await
    }

    async fn update_lesson(&self, id: &str, patch: LessonPatch) -> Result<Option<Lesson>> {
        log_op_start!("update_lesson", lesson_id = id);
        timed("update_lesson", self.inner.update_lesson(id, patch)).await
    }

    async fn delete_lesson(&self, id: &str) -> Result<bool> {
        log_op_start!("delete_lesson", lesson_id = id);
        timed("delete_lesson", self.inner.delete_lesson(id)).await
    }

    async fn search_lessons(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        log_op_start!("search_lessons", query_len = query.len(), user_id = user_id);
        timed("search_lessons", self.inner.search_lessons(query, user_id)).await
    }

    async fn get_user_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<UserProgress>> {
        log_op_start!("get_user_progress", user_id = user_id, lesson_id = lesson_id);
        timed(
            "get_user_progress",
            self.inner.get_user_progress(user_id, lesson_id),
        )
        .await
    }

    async fn update_user_progress(&self, update: ProgressUpdate) -> Result<UserProgress> {
        log_op_start!(
            "update_user_progress",
            user_id = update.user_id.as_str(),
            lesson_id = update.lesson_id.as_str()
        );
        timed("update_user_progress", self.inner.update_user_progress(update)).await
    }

    async fn get_user_bookmarks(&self, user_id: &str) -> Result<Vec<LessonWithProgress>> {
        log_op_start!("get_user_bookmarks", user_id = user_id);
        timed("get_user_bookmarks", self.inner.get_user_bookmarks(user_id)).await
    }

    async fn get_user_completed_lessons(
        &self,
        user_id: &str,
    ) -> Result<Vec<LessonWithProgress>> {
        log_op_start!("get_user_completed_lessons", user_id = user_id);
        timed(
            "get_user_completed_lessons",
            self.inner.get_user_completed_lessons(user_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_len_of_collections() {
        assert_eq!(vec![1, 2, 3].result_len(), Some(3));
        assert_eq!(Some(1).result_len(), Some(1));
        assert_eq!(None::<u8>.result_len(), Some(0));
        assert_eq!(true.result_len(), None);
    }
}
