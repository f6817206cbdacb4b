//! PostgreSQL repository implementation
//!
//! Reads go straight to the pool; a tree read issues one query per level
//! and assembles the result in memory, so it may observe writes that land
//! between those queries. Partial updates lock the row with
//! `SELECT ... FOR UPDATE` inside a transaction; the progress upsert is a
//! single statement.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use studyhub_core::commands::{
    new_id, ClassPatch, LessonPatch, MainTopicPatch, NewClass, NewLesson, NewMainTopic, NewUser,
    ProgressUpdate, UserPatch,
};
use studyhub_core::hierarchy::{with_progress, Hierarchy};
use studyhub_core::model::{
    timestamps, Class, ClassWithLessons, Lesson, LessonWithProgress, MainTopic, MainWithClasses,
    User, UserProgress,
};
use studyhub_core::{search, ExError, Repository, Visibility};

use crate::errors::{from_sqlx, Result};
use crate::migrations::postgres::apply_migrations;
use crate::repo::hydration::{
    class_from_pg, lesson_from_pg, main_from_pg, progress_from_pg, qualified, user_from_pg,
    CLASS_COLUMNS, LESSON_COLUMNS, LESSON_WIDTH, MAIN_COLUMNS, PROGRESS_COLUMNS, USER_COLUMNS,
};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL-backed [`Repository`] over a connection pool
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Open a pool, verify the server answers and apply migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(db_err("connect"))?;
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(db_err("connect"))?;
        tracing::info!(max_connections, "connected to postgres");
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, migrating the database first
    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        apply_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_main(&self, id: &str, op: &'static str) -> Result<Option<MainTopic>> {
        sqlx::query(&format!(
            "SELECT {} FROM main_topics WHERE id = $1",
            MAIN_COLUMNS
        ))
        .bind(id)
        .try_map(|row: PgRow| main_from_pg(&row))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err(op))
    }

    async fn load_class(&self, id: &str, op: &'static str) -> Result<Option<Class>> {
        sqlx::query(&format!("SELECT {} FROM classes WHERE id = $1", CLASS_COLUMNS))
            .bind(id)
            .try_map(|row: PgRow| class_from_pg(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err(op))
    }

    async fn load_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
        op: &'static str,
    ) -> Result<Option<UserProgress>> {
        sqlx::query(&format!(
            "SELECT {} FROM user_progress WHERE user_id = $1 AND lesson_id = $2",
            PROGRESS_COLUMNS
        ))
        .bind(user_id)
        .bind(lesson_id)
        .try_map(|row: PgRow| progress_from_pg(&row, 0))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err(op))
    }

    /// Every progress record of the reading user, keyed by lesson id
    async fn progress_by_lesson(
        &self,
        user_id: Option<&str>,
        op: &'static str,
    ) -> Result<HashMap<String, UserProgress>> {
        let Some(user_id) = user_id else {
            return Ok(HashMap::new());
        };
        let records = sqlx::query(&format!(
            "SELECT {} FROM user_progress WHERE user_id = $1",
            PROGRESS_COLUMNS
        ))
        .bind(user_id)
        .try_map(|row: PgRow| progress_from_pg(&row, 0))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err(op))?;
        Ok(records
            .into_iter()
            .map(|p| (p.lesson_id.clone(), p))
            .collect())
    }

    async fn hierarchy(
        &self,
        main_id: Option<&str>,
        visibility: Visibility,
        user_id: Option<&str>,
        op: &'static str,
    ) -> Result<Hierarchy> {
        let classes = sqlx::query(&format!(
            "SELECT {} FROM classes WHERE ($1::text IS NULL OR main_id = $1) \
             ORDER BY sort_order, seq",
            CLASS_COLUMNS
        ))
        .bind(main_id)
        .try_map(|row: PgRow| class_from_pg(&row))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err(op))?;

        let lessons = sqlx::query(&format!(
            "SELECT {} FROM lessons l JOIN classes c ON c.id = l.class_id \
             WHERE ($1::text IS NULL OR c.main_id = $1) AND ($2 OR l.is_published) \
             ORDER BY l.sort_order, l.seq",
            qualified("l", LESSON_COLUMNS)
        ))
        .bind(main_id)
        .bind(visibility == Visibility::All)
        .try_map(|row: PgRow| lesson_from_pg(&row, 0))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err(op))?;

        let progress = self.progress_by_lesson(user_id, op).await?;
        Ok(Hierarchy::new(classes, lessons, progress.into_values()))
    }

    /// Published lessons joined with the user's progress rows matching `filter`
    async fn progress_lessons(
        &self,
        user_id: &str,
        filter: &str,
        order_by: &str,
        op: &'static str,
    ) -> Result<Vec<LessonWithProgress>> {
        sqlx::query(&format!(
            "SELECT {}, {} FROM user_progress p JOIN lessons l ON l.id = p.lesson_id \
             WHERE p.user_id = $1 AND {} AND l.is_published \
             ORDER BY {}, p.seq DESC",
            qualified("l", LESSON_COLUMNS),
            qualified("p", PROGRESS_COLUMNS),
            filter,
            order_by
        ))
        .bind(user_id)
        .try_map(|row: PgRow| {
            Ok(LessonWithProgress::new(
                lesson_from_pg(&row, 0)?,
                Some(progress_from_pg(&row, LESSON_WIDTH)?),
            ))
        })
        .fetch_all(&self.pool)
        .await
        .map_err(db_err(op))
    }
}

/// Attach the failing operation to a driver error
fn db_err(op: &'static str) -> impl FnOnce(sqlx::Error) -> ExError {
    move |e| from_sqlx(e).with_op(op)
}

const UPSERT_PROGRESS: &str = "INSERT INTO user_progress AS p (
        id, user_id, lesson_id, completed, bookmarked, study_time, notes,
        completed_at, created_at, updated_at
    ) VALUES (
        $1, $2, $3, COALESCE($4, FALSE), COALESCE($5, FALSE), GREATEST(COALESCE($6, 0), 0),
        CASE WHEN $7 THEN $8 ELSE NULL END,
        CASE WHEN $4 THEN $9 ELSE NULL END,
        $9, $9
    )
    ON CONFLICT (user_id, lesson_id) DO UPDATE SET
        completed = COALESCE($4, p.completed),
        bookmarked = COALESCE($5, p.bookmarked),
        study_time = GREATEST(p.study_time, COALESCE($6, p.study_time)),
        notes = CASE WHEN $7 THEN $8 ELSE p.notes END,
        completed_at = CASE WHEN $4 AND p.completed_at IS NULL
            THEN GREATEST($9, p.updated_at + INTERVAL '1 millisecond') ELSE p.completed_at END,
        updated_at = GREATEST($9, p.updated_at + INTERVAL '1 millisecond')
    RETURNING p.id, p.user_id, p.lesson_id, p.completed, p.bookmarked, p.study_time, p.notes,
        p.completed_at, p.created_at, p.updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    // ===== Users =====

    async fn list_users(&self) -> Result<Vec<User>> {
        sqlx::query(&format!("SELECT {} FROM users ORDER BY seq", USER_COLUMNS))
            .try_map(|row: PgRow| user_from_pg(&row))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("list_users"))
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .try_map(|row: PgRow| user_from_pg(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("get_user_by_id"))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email)
            .try_map(|row: PgRow| user_from_pg(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("get_user_by_email"))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let user = user.into_user(new_id(), timestamps::now());
        sqlx::query(
            "INSERT INTO users (id, email, full_name, is_admin, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.is_admin)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("create_user"))?;
        Ok(user)
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        let op = "update_user";
        let mut tx = self.pool.begin().await.map_err(db_err(op))?;
        let Some(mut user) = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(id)
        .try_map(|row: PgRow| user_from_pg(&row))
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err(op))?
        else {
            return Ok(None);
        };
        patch.apply_to(&mut user);
        sqlx::query("UPDATE users SET full_name = $2, is_admin = $3 WHERE id = $1")
            .bind(&user.id)
            .bind(&user.full_name)
            .bind(user.is_admin)
            .execute(&mut *tx)
            .await
            .map_err(db_err(op))?;
        tx.commit().await.map_err(db_err(op))?;
        Ok(Some(user))
    }

    // ===== Main topics =====

    async fn list_mains(
        &self,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<MainWithClasses>> {
        let op = "list_mains";
        let mains = sqlx::query(&format!(
            "SELECT {} FROM main_topics ORDER BY sort_order, seq",
            MAIN_COLUMNS
        ))
        .try_map(|row: PgRow| main_from_pg(&row))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err(op))?;
        let tree = self.hierarchy(None, visibility, user_id, op).await?;
        Ok(mains
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
        let op = "find_main";
        let Some(main) = self.load_main(id, op).await? else {
            return Ok(None);
        };
        let tree = self.hierarchy(Some(id), visibility, user_id, op).await?;
        Ok(Some(tree.assemble_main(main)))
    }

    async fn create_main(&self, main: NewMainTopic) -> Result<MainTopic> {
        let main = main.into_main(new_id(), timestamps::now());
        sqlx::query(
            "INSERT INTO main_topics (id, title, description, icon, sort_order, created_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&main.id)
        .bind(&main.title)
        .bind(&main.description)
        .bind(&main.icon)
        .bind(main.order)
        .bind(&main.created_by)
        .bind(main.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("create_main"))?;
        Ok(main)
    }

    async fn update_main(&self, id: &str, patch: MainTopicPatch) -> Result<Option<MainTopic>> {
        let op = "update_main";
        let mut tx = self.pool.begin().await.map_err(db_err(op))?;
        let Some(mut main) = sqlx::query(&format!(
            "SELECT {} FROM main_topics WHERE id = $1 FOR UPDATE",
            MAIN_COLUMNS
        ))
        .bind(id)
        .try_map(|row: PgRow| main_from_pg(&row))
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err(op))?
        else {
            return Ok(None);
        };
        patch.apply_to(&mut main);
        sqlx::query(
            "UPDATE main_topics SET title = $2, description = $3, icon = $4, sort_order = $5
             WHERE id = $1",
        )
        .bind(&main.id)
        .bind(&main.title)
        .bind(&main.description)
        .bind(&main.icon)
        .bind(main.order)
        .execute(&mut *tx)
        .await
        .map_err(db_err(op))?;
        tx.commit().await.map_err(db_err(op))?;
        Ok(Some(main))
    }

    async fn delete_main(&self, id: &str) -> Result<bool> {
        let done = sqlx::query("DELETE FROM main_topics WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("delete_main"))?;
        Ok(done.rows_affected() > 0)
    }

    // ===== Classes =====

    async fn list_classes(
        &self,
        main_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<ClassWithLessons>> {
        let tree = self
            .hierarchy(Some(main_id), visibility, user_id, "list_classes")
            .await?;
        Ok(tree.top_level_classes(main_id))
    }

    async fn find_class(
        &self,
        id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Option<ClassWithLessons>> {
        let op = "find_class";
        let Some(class) = self.load_class(id, op).await? else {
            return Ok(None);
        };
        let tree = self
            .hierarchy(Some(&class.main_id), visibility, user_id, op)
            .await?;
        Ok(tree.class_tree(id))
    }

    async fn create_class(&self, class: NewClass) -> Result<Class> {
        let class = class.into_class(new_id(), timestamps::now());
        sqlx::query(
            "INSERT INTO classes (id, title, description, main_id, parent_class_id, sort_order, created_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&class.id)
        .bind(&class.title)
        .bind(&class.description)
        .bind(&class.main_id)
        .bind(&class.parent_class_id)
        .bind(class.order)
        .bind(&class.created_by)
        .bind(class.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("create_class"))?;
        Ok(class)
    }

    async fn update_class(&self, id: &str, patch: ClassPatch) -> Result<Option<Class>> {
        let op = "update_class";
        let mut tx = self.pool.begin().await.map_err(db_err(op))?;
        let Some(mut class) = sqlx::query(&format!(
            "SELECT {} FROM classes WHERE id = $1 FOR UPDATE",
            CLASS_COLUMNS
        ))
        .bind(id)
        .try_map(|row: PgRow| class_from_pg(&row))
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err(op))?
        else {
            return Ok(None);
        };
        patch.apply_to(&mut class);
        sqlx::query(
            "UPDATE classes SET title = $2, description = $3, main_id = $4,
                parent_class_id = $5, sort_order = $6
             WHERE id = $1",
        )
        .bind(&class.id)
        .bind(&class.title)
        .bind(&class.description)
        .bind(&class.main_id)
        .bind(&class.parent_class_id)
        .bind(class.order)
        .execute(&mut *tx)
        .await
        .map_err(db_err(op))?;
        tx.commit().await.map_err(db_err(op))?;
        Ok(Some(class))
    }

    async fn delete_class(&self, id: &str) -> Result<bool> {
        let done = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("delete_class"))?;
        Ok(done.rows_affected() > 0)
    }

    // ===== Lessons =====

    async fn list_lessons(
        &self,
        class_id: &str,
        visibility: Visibility,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        let op = "list_lessons";
        let lessons = sqlx::query(&format!(
            "SELECT {} FROM lessons WHERE class_id = $1 AND ($2 OR is_published) \
             ORDER BY sort_order, seq",
            LESSON_COLUMNS
        ))
        .bind(class_id)
        .bind(visibility == Visibility::All)
        .try_map(|row: PgRow| lesson_from_pg(&row, 0))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err(op))?;
        let progress = self.progress_by_lesson(user_id, op).await?;
        Ok(with_progress(lessons, &progress))
    }

    async fn get_lesson_by_id(
        &self,
        id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<LessonWithProgress>> {
        let op = "get_lesson_by_id";
        let lesson = sqlx::query(&format!("SELECT {} FROM lessons WHERE id = $1", LESSON_COLUMNS))
            .bind(id)
            .try_map(|row: PgRow| lesson_from_pg(&row, 0))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err(op))?;
        let Some(lesson) = lesson else {
            return Ok(None);
        };
        let progress = match user_id {
            Some(user_id) => self.load_progress(user_id, id, op).await?,
            None => None,
        };
        Ok(Some(LessonWithProgress::new(lesson, progress)))
    }

    async fn create_lesson(&self, lesson: NewLesson) -> Result<Lesson> {
        let lesson = lesson.into_lesson(new_id(), timestamps::now());
        sqlx::query(&format!(
            "INSERT INTO lessons ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            LESSON_COLUMNS
        ))
        .bind(&lesson.id)
        .bind(&lesson.title)
        .bind(&lesson.content)
        .bind(&lesson.excerpt)
        .bind(&lesson.bible_reference)
        .bind(&lesson.image_url)
        .bind(&lesson.audio_url)
        .bind(lesson.duration)
        .bind(&lesson.class_id)
        .bind(lesson.order)
        .bind(lesson.is_published)
        .bind(&lesson.created_by)
        .bind(lesson.created_at)
        .bind(lesson.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("create_lesson"))?;
        Ok(lesson)
    }

    async fn update_lesson(&self, id: &str, patch: LessonPatch) -> Result<Option<Lesson>> {
        let op = "update_lesson";
        let mut tx = self.pool.begin().await.map_err(db_err(op))?;
        let Some(mut lesson) = sqlx::query(&format!(
            "SELECT {} FROM lessons WHERE id = $1 FOR UPDATE",
            LESSON_COLUMNS
        ))
        .bind(id)
        .try_map(|row: PgRow| lesson_from_pg(&row, 0))
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err(op))?
        else {
            return Ok(None);
        };
        patch.apply_to(&mut lesson);
        sqlx::query(
            "UPDATE lessons SET title = $2, content = $3, excerpt = $4, bible_reference = $5,
                image_url = $6, audio_url = $7, duration = $8, class_id = $9,
                sort_order = $10, is_published = $11, updated_at = $12
             WHERE id = $1",
        )
        .bind(&lesson.id)
        .bind(&lesson.title)
        .bind(&lesson.content)
        .bind(&lesson.excerpt)
        .bind(&lesson.bible_reference)
        .bind(&lesson.image_url)
        .bind(&lesson.audio_url)
        .bind(lesson.duration)
        .bind(&lesson.class_id)
        .bind(lesson.order)
        .bind(lesson.is_published)
        .bind(lesson.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err(op))?;
        tx.commit().await.map_err(db_err(op))?;
        Ok(Some(lesson))
    }

    async fn delete_lesson(&self, id: &str) -> Result<bool> {
        let done = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("delete_lesson"))?;
        Ok(done.rows_affected() > 0)
    }

    async fn search_lessons(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<LessonWithProgress>> {
        let op = "search_lessons";
        let pattern = search::normalize(query).map(search::like_pattern);
        let lessons = sqlx::query(&format!(
            r"SELECT {} FROM lessons
             WHERE is_published AND (
                $1::text IS NULL
                OR title ILIKE $1 ESCAPE '\'
                OR content ILIKE $1 ESCAPE '\'
                OR excerpt ILIKE $1 ESCAPE '\'
                OR bible_reference ILIKE $1 ESCAPE '\'
             )
             ORDER BY created_at DESC, seq DESC",
            LESSON_COLUMNS
        ))
        .bind(pattern)
        .try_map(|row: PgRow| lesson_from_pg(&row, 0))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err(op))?;
        let progress = self.progress_by_lesson(user_id, op).await?;
        Ok(with_progress(lessons, &progress))
    }

    // ===== Progress =====

    async fn get_user_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<UserProgress>> {
        self.load_progress(user_id, lesson_id, "get_user_progress")
            .await
    }

    async fn update_user_progress(&self, update: ProgressUpdate) -> Result<UserProgress> {
        let notes_supplied = update.notes.is_some();
        sqlx::query(UPSERT_PROGRESS)
            .bind(new_id())
            .bind(update.user_id)
            .bind(update.lesson_id)
            .bind(update.completed)
            .bind(update.bookmarked)
            .bind(update.study_time)
            .bind(notes_supplied)
            .bind(update.notes.flatten())
            .bind(timestamps::now())
            .try_map(|row: PgRow| progress_from_pg(&row, 0))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("update_user_progress"))
    }

    async fn get_user_bookmarks(&self, user_id: &str) -> Result<Vec<LessonWithProgress>> {
        self.progress_lessons(
            user_id,
            "p.bookmarked",
            "p.updated_at DESC",
            "get_user_bookmarks",
        )
        .await
    }

    async fn get_user_completed_lessons(
        &self,
        user_id: &str,
    ) -> Result<Vec<LessonWithProgress>> {
        self.progress_lessons(
            user_id,
            "p.completed",
            "p.completed_at DESC NULLS LAST",
            "get_user_completed_lessons",
        )
        .await
    }
}
