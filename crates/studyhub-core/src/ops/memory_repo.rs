use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::store::Store;
use crate::commands::{
    ClassPatch, LessonPatch, MainTopicPatch, NewClass, NewLesson, NewMainTopic, NewUser,
    ProgressUpdate, UserPatch,
};
use crate::errors::{ExError, Result, StudyHubError};
use crate::hierarchy::with_progress;
use crate::model::{
    Class, ClassWithLessons, Lesson, LessonWithProgress, MainTopic, MainWithClasses, User,
    UserProgress,
};
use crate::repository::{Repository, Visibility};

/// Reference backend over in-process maps
///
/// Operations never suspend, so the lock is taken and released inside each
/// call and never held across an `.await`.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, op: &'static str) -> Result<RwLockReadGuard<'_, Store>> {
        self.store
            .read()
            .map_err(|_| StudyHubError::LockPoisoned { op }.into())
    }

    fn write(&self, op: &'static str) -> Result<RwLockWriteGuard<'_, Store>> {
        self.store
            .write()
            .map_err(|_| StudyHubError::LockPoisoned { op }.into())
    }
}

/// Attach the failing operation to a store error
fn in_op(op: &'static str) -> impl FnOnce(StudyHubError) -> ExError {
    move |err| ExError::from(err).with_op(op)
}

fn paired(rows: Vec<(Lesson, UserProgress)>) -> Vec<LessonWithProgress> {
    rows.into_iter()
        .map(|(lesson, progress)| LessonWithProgress::new(lesson, Some(progress)))
        .collect()
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.read("list_users")?.list_users())
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.read("get_user_by_id")?.user(id))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.read("get_user_by_email")?.user_by_email(email))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.write("create_user")?
            .insert_user(user)
            .map_err(in_op("create_user"))
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        Ok(self.write("update_user")?.update_user(id, patch))
    }

    async fn list_mains(
        &self,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<MainWithClasses>> {
        let store = self.read("list_mains")?;
        let tree = store.hierarchy(None, visibility, user_id);
        Ok(store
            .mains()
            .into_iter()
            .map(|main| tree.assemble_main(main))
            .collect())
    }

    async fn find_main(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<MainWithClasses>> {
        let store = self.read("find_main")?;
        let Some(main) = store.main(id) else {
            return Ok(None);
        };
        let tree = store.hierarchy(Some(id), visibility, user_id);
        Ok(Some(tree.assemble_main(main)))
    }

    async fn create_main(&self, main: NewMainTopic) -> Result<MainTopic> {
        self.write("create_main")?
            .insert_main(main)
            .map_err(in_op("create_main"))
    }

    async fn update_main(&self, id: &str, patch: MainTopicPatch) -> Result<Option<MainTopic>> {
        Ok(self.write("update_main")?.update_main(id, patch))
    }

    async fn delete_main(&self, id: &str) -> Result<bool> {
        Ok(self.write("delete_main")?.delete_main(id))
    }

    async fn list_classes(
        &self,
        main_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<ClassWithLessons>> {
        let store = self.read("list_classes")?;
        Ok(store
            .hierarchy(Some(main_id), visibility, user_id)
            .top_level_classes(main_id))
    }

    async fn find_class(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<ClassWithLessons>> {
        let store = self.read("find_class")?;
        let Some(class) = store.class(id) else {
            return Ok(None);
        };
        Ok(store
            .hierarchy(Some(&class.main_id), visibility, user_id)
            .class_tree(id))
    }

    async fn create_class(&self, class: NewClass) -> Result<Class> {
        self.write("create_class")?
            .insert_class(class)
            .map_err(in_op("create_class"))
    }

    async fn update_class(&self, id: &str, patch: ClassPatch) -> Result<Option<Class>> {
        self.write("update_class")?
            .update_class(id, patch)
            .map_err(in_op("update_class"))
    }

    async fn delete_class(&self, id: &str) -> Result<bool> {
        Ok(self.write("delete_class")?.delete_class(id))
    }

    async fn list_lessons(
        &self,
        class_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        let store = self.read("list_lessons")?;
        let lessons = store.lessons(Some(class_id), visibility);
        let progress = store.progress_map(user_id, &lessons);
        Ok(with_progress(lessons, &progress))
    }

    async fn get_lesson_by_id(
        &self,
        id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<LessonWithProgress>> {
        let store = self.read("get_lesson_by_id")?;
        Ok(store.lesson(id).map(|lesson| {
            let progress = user_id.and_then(|u| store.progress_for(u, id).cloned());
            LessonWithProgress::new(lesson, progress)
        }))
    }

    async fn create_lesson(&self, lesson: NewLesson) -> Result<Lesson> {
        self.write("create_lesson")?
            .insert_lesson(lesson)
            .map_err(in_op("create_lesson"))
    }

    async fn update_lesson(&self, id: &str, patch: LessonPatch) -> Result<Option<Lesson>> {
        self.write("update_lesson")?
            .update_lesson(id, patch)
            .map_err(in_op("update_lesson"))
    }

    async fn delete_lesson(&self, id: &str) -> Result<bool> {
        Ok(self.write("delete_lesson")?.delete_lesson(id))
    }

    async fn search_lessons(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        let store = self.read("search_lessons")?;
        let lessons = store.search(query);
        let progress = store.progress_map(user_id, &lessons);
        Ok(with_progress(lessons, &progress))
    }

    async fn get_user_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<UserProgress>> {
        Ok(self
            .read("get_user_progress")?
            .progress_for(user_id, lesson_id)
            .cloned())
    }

    async fn update_user_progress(&self, update: ProgressUpdate) -> Result<UserProgress> {
        self.write("update_user_progress")?
            .upsert_progress(update)
            .map_err(in_op("update_user_progress"))
    }

    async fn get_user_bookmarks(&self, user_id: &str) -> Result<Vec<LessonWithProgress>> {
        Ok(paired(self.read("get_user_bookmarks")?.bookmarks(user_id)))
    }

    async fn get_user_completed_lessons(
        &self,
        user_id: &str,
    ) -> Result<Vec<LessonWithProgress>> {
        Ok(paired(
            self.read("get_user_completed_lessons")?.completed(user_id),
        ))
    }
}

#[cfg(test)]
mod conformance {
    use super::MemoryRepository;

    crate::conformance_tests!(fresh: MemoryRepository::new());
}
