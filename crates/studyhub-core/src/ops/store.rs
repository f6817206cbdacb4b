use std::collections::{HashMap, HashSet};

use crate::commands::{
    new_id, ClassPatch, LessonPatch, MainTopicPatch, NewClass, NewLesson, NewMainTopic, NewUser,
    ProgressUpdate, UserPatch,
};
use crate::errors::StudyHubError;
use crate::hierarchy::Hierarchy;
use crate::model::{timestamps, Class, Lesson, MainTopic, User, UserProgress};
use crate::repository::Visibility;
use crate::search;

pub type StoreResult<T> = std::result::Result<T, StudyHubError>;

/// A stored record plus its insertion sequence number
///
/// The sequence breaks ties between siblings with equal `order`, and
/// between records created within the same millisecond.
#[derive(Debug, Clone)]
pub(crate) struct Row<T> {
    pub(crate) seq: u64,
    pub(crate) record: T,
}

/// In-memory tables for every entity
///
/// Plain synchronous storage: the caller provides locking. All foreign keys
/// and unique constraints of the relational schema are checked here too,
/// and deletes cascade explicitly.
#[derive(Debug, Default)]
pub struct Store {
    next_seq: u64,
    users: HashMap<String, Row<User>>,
    mains: HashMap<String, Row<MainTopic>>,
    classes: HashMap<String, Row<Class>>,
    lessons: HashMap<String, Row<Lesson>>,
    progress: HashMap<String, Row<UserProgress>>,
    /// (user_id, lesson_id) -> progress id
    progress_index: HashMap<(String, String), String>,
}

/// Clone records out of `rows`, sorted by `key` and then insertion order
fn sorted_by<'a, T, K, I>(rows: I, key: impl Fn(&T) -> K) -> Vec<T>
where
    T: Clone + 'a,
    K: Ord,
    I: Iterator<Item = &'a Row<T>>,
{
    let mut rows: Vec<&Row<T>> = rows.collect();
    rows.sort_by(|a, b| {
        key(&a.record)
            .cmp(&key(&b.record))
            .then(a.seq.cmp(&b.seq))
    });
    rows.into_iter().map(|row| row.record.clone()).collect()
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    // ===== Users =====

    pub fn list_users(&self) -> Vec<User> {
        sorted_by(self.users.values(), |_| ())
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|row| row.record.clone())
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .values()
            .find(|row| row.record.email == email)
            .map(|row| row.record.clone())
    }

    /// Insert a user
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEmail` if another user already holds the email.
    pub fn insert_user(&mut self, new_user: NewUser) -> StoreResult<User> {
        if self.user_by_email(&new_user.email).is_some() {
            return Err(StudyHubError::DuplicateEmail {
                email: new_user.email,
            });
        }
        let user = new_user.into_user(new_id(), timestamps::now());
        let seq = self.next_seq();
        self.users.insert(
            user.id.clone(),
            Row {
                seq,
                record: user.clone(),
            },
        );
        Ok(user)
    }

    pub fn update_user(&mut self, id: &str, patch: UserPatch) -> Option<User> {
        let row = self.users.get_mut(id)?;
        patch.apply_to(&mut row.record);
        Some(row.record.clone())
    }

    fn require_user(
        &self,
        id: &str,
        entity: &'static str,
        field: &'static str,
    ) -> StoreResult<()> {
        if self.users.contains_key(id) {
            Ok(())
        } else {
            Err(StudyHubError::MissingReference {
                entity,
                field,
                id: id.to_string(),
            })
        }
    }

    // ===== Main topics =====

    /// All main topics in sibling order
    pub fn mains(&self) -> Vec<MainTopic> {
        sorted_by(self.mains.values(), |m| m.order)
    }

    pub fn main(&self, id: &str) -> Option<MainTopic> {
        self.mains.get(id).map(|row| row.record.clone())
    }

    /// # Errors
    ///
    /// Returns `MissingReference` if `created_by` is not a known user.
    pub fn insert_main(&mut self, new_main: NewMainTopic) -> StoreResult<MainTopic> {
        self.require_user(&new_main.created_by, "main_topics", "created_by")?;
        let main = new_main.into_main(new_id(), timestamps::now());
        let seq = self.next_seq();
        self.mains.insert(
            main.id.clone(),
            Row {
                seq,
                record: main.clone(),
            },
        );
        Ok(main)
    }

    pub fn update_main(&mut self, id: &str, patch: MainTopicPatch) -> Option<MainTopic> {
        let row = self.mains.get_mut(id)?;
        patch.apply_to(&mut row.record);
        Some(row.record.clone())
    }

    /// Remove a main topic with every class below it
    pub fn delete_main(&mut self, id: &str) -> bool {
        if self.mains.remove(id).is_none() {
            return false;
        }
        let roots: Vec<String> = self
            .classes
            .values()
            .filter(|row| row.record.main_id == id)
            .map(|row| row.record.id.clone())
            .collect();
        self.remove_class_subtrees(roots);
        true
    }

    // ===== Classes =====

    /// Classes in sibling order, optionally restricted to one main topic
    pub fn classes(&self, main_id: Option<&str>) -> Vec<Class> {
        sorted_by(
            self.classes
                .values()
                .filter(|row| main_id.map_or(true, |m| row.record.main_id == m)),
            |c| c.order,
        )
    }

    pub fn class(&self, id: &str) -> Option<Class> {
        self.classes.get(id).map(|row| row.record.clone())
    }

    fn check_class_refs(&self, class: &Class) -> StoreResult<()> {
        if !self.mains.contains_key(&class.main_id) {
            return Err(StudyHubError::MissingReference {
                entity: "classes",
                field: "main_id",
                id: class.main_id.clone(),
            });
        }
        if let Some(parent) = &class.parent_class_id {
            if !self.classes.contains_key(parent) {
                return Err(StudyHubError::MissingReference {
                    entity: "classes",
                    field: "parent_class_id",
                    id: parent.clone(),
                });
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `MissingReference` for an unknown main topic, parent class or creator.
    pub fn insert_class(&mut self, new_class: NewClass) -> StoreResult<Class> {
        self.require_user(&new_class.created_by, "classes", "created_by")?;
        let class = new_class.into_class(new_id(), timestamps::now());
        self.check_class_refs(&class)?;
        let seq = self.next_seq();
        self.classes.insert(
            class.id.clone(),
            Row {
                seq,
                record: class.clone(),
            },
        );
        Ok(class)
    }

    /// # Errors
    ///
    /// Returns `MissingReference` if the patch points at an unknown main topic or parent.
    pub fn update_class(&mut self, id: &str, patch: ClassPatch) -> StoreResult<Option<Class>> {
        let Some(mut class) = self.class(id) else {
            return Ok(None);
        };
        patch.apply_to(&mut class);
        self.check_class_refs(&class)?;
        if let Some(row) = self.classes.get_mut(id) {
            row.record = class.clone();
        }
        Ok(Some(class))
    }

    pub fn delete_class(&mut self, id: &str) -> bool {
        if !self.classes.contains_key(id) {
            return false;
        }
        self.remove_class_subtrees(vec![id.to_string()]);
        true
    }

    /// Remove `roots`, every class below them, their lessons and progress
    fn remove_class_subtrees(&mut self, roots: Vec<String>) {
        let mut doomed: HashSet<String> = HashSet::new();
        let mut frontier = roots;
        while let Some(class_id) = frontier.pop() {
            if !doomed.insert(class_id.clone()) {
                continue;
            }
            frontier.extend(
                self.classes
                    .values()
                    .filter(|row| row.record.parent_class_id.as_deref() == Some(class_id.as_str()))
                    .map(|row| row.record.id.clone()),
            );
        }

        let lesson_ids: Vec<String> = self
            .lessons
            .values()
            .filter(|row| doomed.contains(&row.record.class_id))
            .map(|row| row.record.id.clone())
            .collect();
        for lesson_id in &lesson_ids {
            self.remove_lesson(lesson_id);
        }
        self.classes.retain(|id, _| !doomed.contains(id));
    }

    // ===== Lessons =====

    /// Lessons in sibling order, filtered by class and visibility
    pub fn lessons(&self, class_id: Option<&str>, visibility: Visibility) -> Vec<Lesson> {
        sorted_by(
            self.lessons.values().filter(|row| {
                class_id.map_or(true, |c| row.record.class_id == c)
                    && visibility.admits(&row.record)
            }),
            |l| l.order,
        )
    }

    pub fn lesson(&self, id: &str) -> Option<Lesson> {
        self.lessons.get(id).map(|row| row.record.clone())
    }

    fn check_lesson_refs(&self, lesson: &Lesson) -> StoreResult<()> {
        if self.classes.contains_key(&lesson.class_id) {
            Ok(())
        } else {
            Err(StudyHubError::MissingReference {
                entity: "lessons",
                field: "class_id",
                id: lesson.class_id.clone(),
            })
        }
    }

    /// # Errors
    ///
    /// Returns `MissingReference` for an unknown class or creator.
    pub fn insert_lesson(&mut self, new_lesson: NewLesson) -> StoreResult<Lesson> {
        self.require_user(&new_lesson.created_by, "lessons", "created_by")?;
        let lesson = new_lesson.into_lesson(new_id(), timestamps::now());
        self.check_lesson_refs(&lesson)?;
        let seq = self.next_seq();
        self.lessons.insert(
            lesson.id.clone(),
            Row {
                seq,
                record: lesson.clone(),
            },
        );
        Ok(lesson)
    }

    /// # Errors
    ///
    /// Returns `MissingReference` if the patch moves the lesson to an unknown class.
    pub fn update_lesson(&mut self, id: &str, patch: LessonPatch) -> StoreResult<Option<Lesson>> {
        let Some(mut lesson) = self.lesson(id) else {
            return Ok(None);
        };
        patch.apply_to(&mut lesson);
        self.check_lesson_refs(&lesson)?;
        if let Some(row) = self.lessons.get_mut(id) {
            row.record = lesson.clone();
        }
        Ok(Some(lesson))
    }

    pub fn delete_lesson(&mut self, id: &str) -> bool {
        self.remove_lesson(id)
    }

    fn remove_lesson(&mut self, id: &str) -> bool {
        if self.lessons.remove(id).is_none() {
            return false;
        }
        let progress_ids: Vec<String> = self
            .progress
            .values()
            .filter(|row| row.record.lesson_id == id)
            .map(|row| row.record.id.clone())
            .collect();
        for progress_id in progress_ids {
            if let Some(row) = self.progress.remove(&progress_id) {
                self.progress_index
                    .remove(&(row.record.user_id, row.record.lesson_id));
            }
        }
        true
    }

    /// Published lessons matching `query`, newest first
    pub fn search(&self, query: &str) -> Vec<Lesson> {
        let needle = search::needle(query);
        let mut hits: Vec<&Row<Lesson>> = self
            .lessons
            .values()
            .filter(|row| row.record.is_published)
            .filter(|row| {
                needle
                    .as_deref()
                    .map_or(true, |n| search::matches(&row.record, n))
            })
            .collect();
        hits.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        hits.into_iter().map(|row| row.record.clone()).collect()
    }

    // ===== Progress =====

    pub fn progress_for(&self, user_id: &str, lesson_id: &str) -> Option<&UserProgress> {
        let id = self
            .progress_index
            .get(&(user_id.to_string(), lesson_id.to_string()))?;
        self.progress.get(id).map(|row| &row.record)
    }

    /// Progress of `user_id` for each of `lessons`, keyed by lesson id
    pub fn progress_map(
        &self,
        user_id: Option<&str>,
        lessons: &[Lesson],
    ) -> HashMap<String, UserProgress> {
        let Some(user_id) = user_id else {
            return HashMap::new();
        };
        lessons
            .iter()
            .filter_map(|l| self.progress_for(user_id, &l.id))
            .map(|p| (p.lesson_id.clone(), p.clone()))
            .collect()
    }

    /// # Errors
    ///
    /// Returns `MissingReference` for an unknown user or lesson.
    pub fn upsert_progress(&mut self, update: ProgressUpdate) -> StoreResult<UserProgress> {
        self.require_user(&update.user_id, "user_progress", "user_id")?;
        if !self.lessons.contains_key(&update.lesson_id) {
            return Err(StudyHubError::MissingReference {
                entity: "user_progress",
                field: "lesson_id",
                id: update.lesson_id,
            });
        }

        let key = (update.user_id.clone(), update.lesson_id.clone());
        if let Some(row) = self
            .progress_index
            .get(&key)
            .and_then(|id| self.progress.get_mut(id))
        {
            update.merge_into(&mut row.record);
            return Ok(row.record.clone());
        }

        let record = update.into_new_record(new_id(), timestamps::now());
        let seq = self.next_seq();
        self.progress_index.insert(key, record.id.clone());
        self.progress.insert(
            record.id.clone(),
            Row {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    /// Published lessons paired with the user's progress rows that pass `keep`
    ///
    /// Sorted by `key` descending, ties broken by later-inserted progress first.
    fn progress_lessons<K: Ord>(
        &self,
        user_id: &str,
        keep: impl Fn(&UserProgress) -> bool,
        key: impl Fn(&UserProgress) -> K,
    ) -> Vec<(Lesson, UserProgress)> {
        let mut rows: Vec<(&Row<UserProgress>, &Lesson)> = self
            .progress
            .values()
            .filter(|row| row.record.user_id == user_id && keep(&row.record))
            .filter_map(|row| {
                let lesson = &self.lessons.get(&row.record.lesson_id)?.record;
                lesson.is_published.then_some((row, lesson))
            })
            .collect();
        rows.sort_by(|(a, _), (b, _)| {
            key(&b.record)
                .cmp(&key(&a.record))
                .then(b.seq.cmp(&a.seq))
        });
        rows.into_iter()
            .map(|(row, lesson)| (lesson.clone(), row.record.clone()))
            .collect()
    }

    pub fn bookmarks(&self, user_id: &str) -> Vec<(Lesson, UserProgress)> {
        self.progress_lessons(user_id, |p| p.bookmarked, |p| p.updated_at)
    }

    pub fn completed(&self, user_id: &str) -> Vec<(Lesson, UserProgress)> {
        self.progress_lessons(user_id, |p| p.completed, |p| p.completed_at)
    }

    // ===== Trees =====

    /// Index the classes and visible lessons of one main topic (or all)
    pub fn hierarchy(
        &self,
        main_id: Option<&str>,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Hierarchy {
        let classes = self.classes(main_id);
        let class_ids: HashSet<&str> = classes.iter().map(|c| c.id.as_str()).collect();
        let lessons: Vec<Lesson> = self
            .lessons(None, visibility)
            .into_iter()
            .filter(|l| class_ids.contains(l.class_id.as_str()))
            .collect();
        let progress = self.progress_map(user_id, &lessons);
        Hierarchy::new(classes, lessons, progress.into_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Store, User, MainTopic, Class) {
        let mut store = Store::new();
        let user = store
            .insert_user(NewUser {
                email: "admin@example.com".to_string(),
                full_name: "Admin".to_string(),
                is_admin: true,
            })
            .unwrap();
        let main = store
            .insert_main(NewMainTopic {
                title: "Test".to_string(),
                description: None,
                icon: None,
                order: 0,
                created_by: user.id.clone(),
            })
            .unwrap();
        let class = store
            .insert_class(NewClass {
                title: "Class".to_string(),
                description: None,
                main_id: main.id.clone(),
                parent_class_id: None,
                order: 0,
                created_by: user.id.clone(),
            })
            .unwrap();
        (store, user, main, class)
    }

    fn lesson_in(class_id: &str, user_id: &str, title: &str) -> NewLesson {
        NewLesson {
            title: title.to_string(),
            content: "<p>content</p>".to_string(),
            excerpt: None,
            bible_reference: None,
            image_url: None,
            audio_url: None,
            duration: None,
            class_id: class_id.to_string(),
            order: 0,
            is_published: true,
            created_by: user_id.to_string(),
        }
    }

    #[test]
    fn test_equal_order_keeps_insertion_sequence() {
        let (mut store, user, _, class) = seeded();
        for title in ["first", "second", "third"] {
            store
                .insert_lesson(lesson_in(&class.id, &user.id, title))
                .unwrap();
        }
        let titles: Vec<String> = store
            .lessons(Some(&class.id), Visibility::All)
            .into_iter()
            .map(|l| l.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_progress_index_is_cleared_on_lesson_delete() {
        let (mut store, user, _, class) = seeded();
        let lesson = store
            .insert_lesson(lesson_in(&class.id, &user.id, "gone"))
            .unwrap();
        store
            .upsert_progress(ProgressUpdate::new(&user.id, &lesson.id).bookmarked(true))
            .unwrap();

        assert!(store.delete_lesson(&lesson.id));
        assert!(store.progress_for(&user.id, &lesson.id).is_none());
        assert!(store.progress.is_empty());
        assert!(store.progress_index.is_empty());
    }

    #[test]
    fn test_delete_main_removes_nested_classes() {
        let (mut store, user, main, class) = seeded();
        let sub = store
            .insert_class(NewClass {
                title: "Sub".to_string(),
                description: None,
                main_id: main.id.clone(),
                parent_class_id: Some(class.id.clone()),
                order: 0,
                created_by: user.id.clone(),
            })
            .unwrap();
        store
            .insert_lesson(lesson_in(&sub.id, &user.id, "deep"))
            .unwrap();

        assert!(store.delete_main(&main.id));
        assert!(store.classes.is_empty());
        assert!(store.lessons.is_empty());
        assert!(!store.delete_main(&main.id));
    }

    #[test]
    fn test_update_class_rejects_unknown_parent() {
        let (mut store, _, _, class) = seeded();
        let err = store
            .update_class(
                &class.id,
                ClassPatch {
                    parent_class_id: Some(Some("missing".to_string())),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            StudyHubError::MissingReference {
                field: "parent_class_id",
                ..
            }
        ));
        assert_eq!(store.class(&class.id).unwrap().parent_class_id, None);
    }
}
