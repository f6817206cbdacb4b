//! SQLite repository implementation
//!
//! One connection behind a mutex. Every call takes the lock, runs its
//! statements synchronously and releases it before returning, so a guard is
//! never held across an `.await`. Partial updates read, patch and write back
//! inside one transaction; the progress upsert is a single statement.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Params};
use studyhub_core::commands::{
    new_id, ClassPatch, LessonPatch, MainTopicPatch, NewClass, NewLesson, NewMainTopic, NewUser,
    ProgressUpdate, UserPatch,
};
use studyhub_core::hierarchy::{with_progress, Hierarchy};
use studyhub_core::model::{
    timestamps, Class, ClassWithLessons, Lesson, LessonWithProgress, MainTopic, MainWithClasses,
    User, UserProgress,
};
use studyhub_core::{search, Repository, Visibility};

use crate::db::{self, CONTAINS_FOLDED};
use crate::errors::{from_rusqlite, lock_poisoned, Result};
use crate::migrations::apply_migrations;
use crate::repo::hydration::{
    class_from_row, lesson_from_row, main_from_row, progress_from_row, qualified,
    user_from_row, CLASS_COLUMNS, LESSON_COLUMNS, LESSON_WIDTH, MAIN_COLUMNS, PROGRESS_COLUMNS,
    USER_COLUMNS,
};

/// SQLite-backed [`Repository`]
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open a database file, creating it and applying migrations as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(db::open(path)?)
    }

    /// Fresh private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    /// Wrap an already configured connection, migrating it first
    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock().map_err(|_| lock_poisoned(op))?;
        f(&mut conn).map_err(|e| from_rusqlite(e).with_op(op))
    }
}

// ===== Queries =====

fn query_all<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    f: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, f)?.collect();
    rows
}

fn load_main(conn: &Connection, id: &str) -> rusqlite::Result<Option<MainTopic>> {
    conn.query_row(
        &format!("SELECT {} FROM main_topics WHERE id = ?1", MAIN_COLUMNS),
        [id],
        main_from_row,
    )
    .optional()
}

fn load_mains(conn: &Connection) -> rusqlite::Result<Vec<MainTopic>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM main_topics ORDER BY sort_order, rowid",
            MAIN_COLUMNS
        ),
        [],
        main_from_row,
    )
}

fn load_class(conn: &Connection, id: &str) -> rusqlite::Result<Option<Class>> {
    conn.query_row(
        &format!("SELECT {} FROM classes WHERE id = ?1", CLASS_COLUMNS),
        [id],
        class_from_row,
    )
    .optional()
}

/// Classes in sibling order, optionally restricted to one main topic
fn load_classes(conn: &Connection, main_id: Option<&str>) -> rusqlite::Result<Vec<Class>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM classes WHERE (?1 IS NULL OR main_id = ?1) \
             ORDER BY sort_order, rowid",
            CLASS_COLUMNS
        ),
        [main_id],
        class_from_row,
    )
}

fn load_lesson(conn: &Connection, id: &str) -> rusqlite::Result<Option<Lesson>> {
    conn.query_row(
        &format!("SELECT {} FROM lessons WHERE id = ?1", LESSON_COLUMNS),
        [id],
        |row| lesson_from_row(row, 0),
    )
    .optional()
}

fn load_class_lessons(
    conn: &Connection,
    class_id: &str,
    visibility: Visibility,
) -> rusqlite::Result<Vec<Lesson>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM lessons WHERE class_id = ?1 AND (?2 OR is_published = 1) \
             ORDER BY sort_order, rowid",
            LESSON_COLUMNS
        ),
        rusqlite::params![class_id, visibility == Visibility::All],
        |row| lesson_from_row(row, 0),
    )
}

/// Visible lessons of every class of one main topic (or of all topics)
fn load_scope_lessons(
    conn: &Connection,
    main_id: Option<&str>,
    visibility: Visibility,
) -> rusqlite::Result<Vec<Lesson>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM lessons l JOIN classes c ON c.id = l.class_id \
             WHERE (?1 IS NULL OR c.main_id = ?1) AND (?2 OR l.is_published = 1) \
             ORDER BY l.sort_order, l.rowid",
            qualified("l", LESSON_COLUMNS)
        ),
        rusqlite::params![main_id, visibility == Visibility::All],
        |row| lesson_from_row(row, 0),
    )
}

fn load_progress(
    conn: &Connection,
    user_id: &str,
    lesson_id: &str,
) -> rusqlite::Result<Option<UserProgress>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM user_progress WHERE user_id = ?1 AND lesson_id = ?2",
            PROGRESS_COLUMNS
        ),
        [user_id, lesson_id],
        |row| progress_from_row(row, 0),
    )
    .optional()
}

/// Every progress record of the reading user, keyed by lesson id
fn progress_by_lesson(
    conn: &Connection,
    user_id: Option<&str>,
) -> rusqlite::Result<HashMap<String, UserProgress>> {
    let Some(user_id) = user_id else {
        return Ok(HashMap::new());
    };
    let records = query_all(
        conn,
        &format!(
            "SELECT {} FROM user_progress WHERE user_id = ?1",
            PROGRESS_COLUMNS
        ),
        [user_id],
        |row| progress_from_row(row, 0),
    )?;
    Ok(records
        .into_iter()
        .map(|p| (p.lesson_id.clone(), p))
        .collect())
}

fn hierarchy(
    conn: &Connection,
    main_id: Option<&str>,
    visibility: Visibility,
    user_id: Option<&str>,
) -> rusqlite::Result<Hierarchy> {
    let classes = load_classes(conn, main_id)?;
    let lessons = load_scope_lessons(conn, main_id, visibility)?;
    let progress = progress_by_lesson(conn, user_id)?;
    Ok(Hierarchy::new(classes, lessons, progress.into_values()))
}

/// Published lessons joined with the user's progress rows matching `filter`
fn progress_lessons(
    conn: &Connection,
    user_id: &str,
    filter: &str,
    order_by: &str,
) -> rusqlite::Result<Vec<LessonWithProgress>> {
    query_all(
        conn,
        &format!(
            "SELECT {}, {} FROM user_progress p JOIN lessons l ON l.id = p.lesson_id \
             WHERE p.user_id = ?1 AND {} AND l.is_published = 1 \
             ORDER BY {}, p.rowid DESC",
            qualified("l", LESSON_COLUMNS),
            qualified("p", PROGRESS_COLUMNS),
            filter,
            order_by
        ),
        [user_id],
        |row| {
            Ok(LessonWithProgress::new(
                lesson_from_row(row, 0)?,
                Some(progress_from_row(row, LESSON_WIDTH)?),
            ))
        },
    )
}

const UPSERT_PROGRESS: &str = "INSERT INTO user_progress (
        id, user_id, lesson_id, completed, bookmarked, study_time, notes,
        completed_at, created_at, updated_at
    ) VALUES (
        ?1, ?2, ?3, COALESCE(?4, 0), COALESCE(?5, 0), MAX(COALESCE(?6, 0), 0),
        CASE WHEN ?7 THEN ?8 ELSE NULL END,
        CASE WHEN ?4 THEN ?9 ELSE NULL END,
        ?9, ?9
    )
    ON CONFLICT(user_id, lesson_id) DO UPDATE SET
        completed = COALESCE(?4, completed),
        bookmarked = COALESCE(?5, bookmarked),
        study_time = MAX(study_time, COALESCE(?6, study_time)),
        notes = CASE WHEN ?7 THEN ?8 ELSE notes END,
        completed_at = CASE WHEN ?4 AND completed_at IS NULL
            THEN MAX(?9, updated_at + 1) ELSE completed_at END,
        updated_at = MAX(?9, updated_at + 1)
    RETURNING id, user_id, lesson_id, completed, bookmarked, study_time, notes,
        completed_at, created_at, updated_at";

#[async_trait]
impl Repository for SqliteRepository {
    // ===== Users =====

    async fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn("list_users", |conn| {
            query_all(
                conn,
                &format!("SELECT {} FROM users ORDER BY rowid", USER_COLUMNS),
                [],
                user_from_row,
            )
        })
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.with_conn("get_user_by_id", |conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                [id],
                user_from_row,
            )
            .optional()
        })
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn("get_user_by_email", |conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                [email],
                user_from_row,
            )
            .optional()
        })
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let user = user.into_user(new_id(), timestamps::now());
        self.with_conn("create_user", |conn| {
            conn.execute(
                "INSERT INTO users (id, email, full_name, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    user.id,
                    user.email,
                    user.full_name,
                    user.is_admin,
                    user.created_at.timestamp_millis(),
                ],
            )
        })?;
        Ok(user)
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        self.with_conn("update_user", |conn| {
            let tx = conn.transaction()?;
            let Some(mut user) = tx
                .query_row(
                    &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                    [id],
                    user_from_row,
                )
                .optional()?
            else {
                return Ok(None);
            };
            patch.apply_to(&mut user);
            tx.execute(
                "UPDATE users SET full_name = ?2, is_admin = ?3 WHERE id = ?1",
                rusqlite::params![user.id, user.full_name, user.is_admin],
            )?;
            tx.commit()?;
            Ok(Some(user))
        })
    }

    // ===== Main topics =====

    async fn list_mains(
        &self,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<MainWithClasses>> {
        self.with_conn("list_mains", |conn| {
            let tree = hierarchy(conn, None, visibility, user_id)?;
            Ok(load_mains(conn)?
                .into_iter()
                .map(|main| tree.assemble_main(main))
                .collect())
        })
    }

    async fn find_main(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<MainWithClasses>> {
        self.with_conn("find_main", |conn| {
            let Some(main) = load_main(conn, id)? else {
                return Ok(None);
            };
            let tree = hierarchy(conn, Some(id), visibility, user_id)?;
            Ok(Some(tree.assemble_main(main)))
        })
    }

    async fn create_main(&self, main: NewMainTopic) -> Result<MainTopic> {
        let main = main.into_main(new_id(), timestamps::now());
        self.with_conn("create_main", |conn| {
            conn.execute(
                "INSERT INTO main_topics (id, title, description, icon, sort_order, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    main.id,
                    main.title,
                    main.description,
                    main.icon,
                    main.order,
                    main.created_by,
                    main.created_at.timestamp_millis(),
                ],
            )
        })?;
        Ok(main)
    }

    async fn update_main(&self, id: &str, patch: MainTopicPatch) -> Result<Option<MainTopic>> {
        self.with_conn("update_main", |conn| {
            let tx = conn.transaction()?;
            let Some(mut main) = load_main(&tx, id)? else {
                return Ok(None);
            };
            patch.apply_to(&mut main);
            tx.execute(
                "UPDATE main_topics SET title = ?2, description = ?3, icon = ?4, sort_order = ?5
                 WHERE id = ?1",
                rusqlite::params![main.id, main.title, main.description, main.icon, main.order],
            )?;
            tx.commit()?;
            Ok(Some(main))
        })
    }

    async fn delete_main(&self, id: &str) -> Result<bool> {
        self.with_conn("delete_main", |conn| {
            Ok(conn.execute("DELETE FROM main_topics WHERE id = ?1", [id])? > 0)
        })
    }

    // ===== Classes =====

    async fn list_classes(
        &self,
        main_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<ClassWithLessons>> {
        self.with_conn("list_classes", |conn| {
            Ok(hierarchy(conn, Some(main_id), visibility, user_id)?.top_level_classes(main_id))
        })
    }

    async fn find_class(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<ClassWithLessons>> {
        self.with_conn("find_class", |conn| {
            let Some(class) = load_class(conn, id)? else {
                return Ok(None);
            };
            Ok(hierarchy(conn, Some(&class.main_id), visibility, user_id)?.class_tree(id))
        })
    }

    async fn create_class(&self, class: NewClass) -> Result<Class> {
        let class = class.into_class(new_id(), timestamps::now());
        self.with_conn("create_class", |conn| {
            conn.execute(
                "INSERT INTO classes (id, title, description, main_id, parent_class_id, sort_order, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    class.id,
                    class.title,
                    class.description,
                    class.main_id,
                    class.parent_class_id,
                    class.order,
                    class.created_by,
                    class.created_at.timestamp_millis(),
                ],
            )
        })?;
        Ok(class)
    }

    async fn update_class(&self, id: &str, patch: ClassPatch) -> Result<Option<Class>> {
        self.with_conn("update_class", |conn| {
            let tx = conn.transaction()?;
            let Some(mut class) = load_class(&tx, id)? else {
                return Ok(None);
            };
            patch.apply_to(&mut class);
            tx.execute(
                "UPDATE classes SET title = ?2, description = ?3, main_id = ?4,
                    parent_class_id = ?5, sort_order = ?6
                 WHERE id = ?1",
                rusqlite::params![
                    class.id,
                    class.title,
                    class.description,
                    class.main_id,
                    class.parent_class_id,
                    class.order,
                ],
            )?;
            tx.commit()?;
            Ok(Some(class))
        })
    }

    async fn delete_class(&self, id: &str) -> Result<bool> {
        self.with_conn("delete_class", |conn| {
            Ok(conn.execute("DELETE FROM classes WHERE id = ?1", [id])? > 0)
        })
    }

    // ===== Lessons =====

    async fn list_lessons(
        &self,
        class_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        self.with_conn("list_lessons", |conn| {
            let lessons = load_class_lessons(conn, class_id, visibility)?;
            let progress = progress_by_lesson(conn, user_id)?;
            Ok(with_progress(lessons, &progress))
        })
    }

    async fn get_lesson_by_id(
        &self,
        id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<LessonWithProgress>> {
        self.with_conn("get_lesson_by_id", |conn| {
            let Some(lesson) = load_lesson(conn, id)? else {
                return Ok(None);
            };
            let progress = match user_id {
                Some(user_id) => load_progress(conn, user_id, id)?,
                None => None,
            };
            Ok(Some(LessonWithProgress::new(lesson, progress)))
        })
    }

    async fn create_lesson(&self, lesson: NewLesson) -> Result<Lesson> {
        let lesson = lesson.into_lesson(new_id(), timestamps::now());
        self.with_conn("create_lesson", |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO lessons ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    LESSON_COLUMNS
                ),
                rusqlite::params![
                    lesson.id,
                    lesson.title,
                    lesson.content,
                    lesson.excerpt,
                    lesson.bible_reference,
                    lesson.image_url,
                    lesson.audio_url,
                    lesson.duration,
                    lesson.class_id,
                    lesson.order,
                    lesson.is_published,
                    lesson.created_by,
                    lesson.created_at.timestamp_millis(),
                    lesson.updated_at.timestamp_millis(),
                ],
            )
        })?;
        Ok(lesson)
    }

    async fn update_lesson(&self, id: &str, patch: LessonPatch) -> Result<Option<Lesson>> {
        self.with_conn("update_lesson", |conn| {
            let tx = conn.transaction()?;
            let Some(mut lesson) = load_lesson(&tx, id)? else {
                return Ok(None);
            };
            patch.apply_to(&mut lesson);
            tx.execute(
                "UPDATE lessons SET title = ?2, content = ?3, excerpt = ?4, bible_reference = ?5,
                    image_url = ?6, audio_url = ?7, duration = ?8, class_id = ?9,
                    sort_order = ?10, is_published = ?11, updated_at = ?12
                 WHERE id = ?1",
                rusqlite::params![
                    lesson.id,
                    lesson.title,
                    lesson.content,
                    lesson.excerpt,
                    lesson.bible_reference,
                    lesson.image_url,
                    lesson.audio_url,
                    lesson.duration,
                    lesson.class_id,
                    lesson.order,
                    lesson.is_published,
                    lesson.updated_at.timestamp_millis(),
                ],
            )?;
            tx.commit()?;
            Ok(Some(lesson))
        })
    }

    async fn delete_lesson(&self, id: &str) -> Result<bool> {
        self.with_conn("delete_lesson", |conn| {
            Ok(conn.execute("DELETE FROM lessons WHERE id = ?1", [id])? > 0)
        })
    }

    async fn search_lessons(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        let needle = search::needle(query);
        self.with_conn("search_lessons", |conn| {
            let lessons = query_all(
                conn,
                &format!(
                    "SELECT {columns} FROM lessons
                     WHERE is_published = 1 AND (
                        ?1 IS NULL
                        OR {f}(title, ?1)
                        OR {f}(content, ?1)
                        OR {f}(excerpt, ?1)
                        OR {f}(bible_reference, ?1)
                     )
                     ORDER BY created_at DESC, rowid DESC",
                    columns = LESSON_COLUMNS,
                    f = CONTAINS_FOLDED,
                ),
                [needle],
                |row| lesson_from_row(row, 0),
            )?;
            let progress = progress_by_lesson(conn, user_id)?;
            Ok(with_progress(lessons, &progress))
        })
    }

    // ===== Progress =====

    async fn get_user_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<UserProgress>> {
        self.with_conn("get_user_progress", |conn| {
            load_progress(conn, user_id, lesson_id)
        })
    }

    async fn update_user_progress(&self, update: ProgressUpdate) -> Result<UserProgress> {
        let id = new_id();
        let now = timestamps::now().timestamp_millis();
        let notes_supplied = update.notes.is_some();
        self.with_conn("update_user_progress", |conn| {
            conn.query_row(
                UPSERT_PROGRESS,
                rusqlite::params![
                    id,
                    update.user_id,
                    update.lesson_id,
                    update.completed,
                    update.bookmarked,
                    update.study_time,
                    notes_supplied,
                    update.notes.flatten(),
                    now,
                ],
                |row| progress_from_row(row, 0),
            )
        })
    }

    async fn get_user_bookmarks(&self, user_id: &str) -> Result<Vec<LessonWithProgress>> {
        self.with_conn("get_user_bookmarks", |conn| {
            progress_lessons(conn, user_id, "p.bookmarked = 1", "p.updated_at DESC")
        })
    }

    async fn get_user_completed_lessons(
        &self,
        user_id: &str,
    ) -> Result<Vec<LessonWithProgress>> {
        self.with_conn("get_user_completed_lessons", |conn| {
            progress_lessons(conn, user_id, "p.completed = 1", "p.completed_at DESC")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> SqliteRepository {
        SqliteRepository::open_in_memory().unwrap()
    }

    async fn admin(repo: &SqliteRepository) -> User {
        repo.create_user(NewUser {
            email: "admin@example.com".to_string(),
            full_name: "Admin".to_string(),
            is_admin: true,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let repo = repo();
        let err = repo
            .create_main(NewMainTopic {
                title: "Orphan".to_string(),
                description: None,
                icon: None,
                order: 0,
                created_by: "nobody".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(err.op(), Some("create_main"));
    }

    #[tokio::test]
    async fn test_upsert_keeps_created_at_and_id() {
        let repo = repo();
        let user = admin(&repo).await;
        let main = repo
            .create_main(NewMainTopic {
                title: "Main".to_string(),
                description: None,
                icon: None,
                order: 0,
                created_by: user.id.clone(),
            })
            .await
            .unwrap();
        let class = repo
            .create_class(NewClass {
                title: "Class".to_string(),
                description: None,
                main_id: main.id.clone(),
                parent_class_id: None,
                order: 0,
                created_by: user.id.clone(),
            })
            .await
            .unwrap();
        let lesson = repo
            .create_lesson(NewLesson {
                title: "Lesson".to_string(),
                content: "Body".to_string(),
                excerpt: None,
                bible_reference: None,
                image_url: None,
                audio_url: None,
                duration: None,
                class_id: class.id.clone(),
                order: 0,
                is_published: true,
                created_by: user.id.clone(),
            })
            .await
            .unwrap();

        let first = repo
            .update_user_progress(ProgressUpdate::new(&user.id, &lesson.id).study_time(5))
            .await
            .unwrap();
        let second = repo
            .update_user_progress(ProgressUpdate::new(&user.id, &lesson.id).completed(true))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.completed_at, Some(second.updated_at));
        assert_eq!(second.study_time, 5);
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_sensitive() {
        let repo = repo();
        admin(&repo).await;
        assert!(repo
            .get_user_by_email("ADMIN@example.com")
            .await
            .unwrap()
            .is_none());
    }
}
