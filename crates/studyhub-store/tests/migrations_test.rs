// Integration tests for the SQLite migration runner

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rusqlite::Connection;

fn setup_test_db() -> Connection {
    studyhub_store::db::open_in_memory().expect("Failed to create in-memory database")
}

fn table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap();
    names
}

#[test]
fn test_apply_migrations_on_empty_db() {
    // Given: An empty SQLite database
    let mut conn = setup_test_db();

    // When: Migrations are applied
    let applied = studyhub_store::migrations::apply_migrations(&mut conn).unwrap();

    // Then: The initial schema is recorded
    assert_eq!(applied, vec!["001_initial_schema"]);

    // And: Every content table exists
    let tables = table_names(&conn);
    for expected in [
        "schema_version",
        "users",
        "main_topics",
        "classes",
        "lessons",
        "user_progress",
    ] {
        assert!(
            tables.contains(&expected.to_string()),
            "Missing table: {}",
            expected
        );
    }
}

#[test]
fn test_reapplying_is_a_no_op() {
    // Given: A migrated database
    let mut conn = setup_test_db();
    studyhub_store::migrations::apply_migrations(&mut conn).unwrap();

    // When: Migrations run again
    let applied = studyhub_store::migrations::apply_migrations(&mut conn).unwrap();

    // Then: Nothing new is applied and the ledger holds one row
    assert!(applied.is_empty());
    assert_eq!(
        studyhub_store::migrations::applied_migrations(&conn).unwrap(),
        vec!["001_initial_schema".to_string()]
    );
}

#[test]
fn test_progress_pair_is_unique() {
    // Given: A migrated database with one progress row
    let mut conn = setup_test_db();
    studyhub_store::migrations::apply_migrations(&mut conn).unwrap();
    conn.execute_batch(
        "INSERT INTO users (id, email, full_name, is_admin, created_at)
            VALUES ('u1', 'a@example.com', 'A', 0, 0);
         INSERT INTO main_topics (id, title, sort_order, created_by, created_at)
            VALUES ('m1', 'Main', 0, 'u1', 0);
         INSERT INTO classes (id, title, main_id, sort_order, created_by, created_at)
            VALUES ('c1', 'Class', 'm1', 0, 'u1', 0);
         INSERT INTO lessons (id, title, content, class_id, sort_order, is_published, created_by, created_at, updated_at)
            VALUES ('l1', 'Lesson', 'Body', 'c1', 0, 1, 'u1', 0, 0);
         INSERT INTO user_progress (id, user_id, lesson_id, created_at, updated_at)
            VALUES ('p1', 'u1', 'l1', 0, 0);",
    )
    .unwrap();

    // When: A second row for the same pair is inserted
    let result = conn.execute(
        "INSERT INTO user_progress (id, user_id, lesson_id, created_at, updated_at)
            VALUES ('p2', 'u1', 'l1', 0, 0)",
        [],
    );

    // Then: The unique constraint rejects it
    let err = studyhub_store::errors::from_rusqlite(result.unwrap_err());
    assert!(err.is_constraint_violation());
}

#[test]
fn test_deleting_main_cascades_through_schema() {
    // Given: A main topic with a nested class, a lesson and progress
    let mut conn = setup_test_db();
    studyhub_store::migrations::apply_migrations(&mut conn).unwrap();
    conn.execute_batch(
        "INSERT INTO users (id, email, full_name, is_admin, created_at)
            VALUES ('u1', 'a@example.com', 'A', 0, 0);
         INSERT INTO main_topics (id, title, sort_order, created_by, created_at)
            VALUES ('m1', 'Main', 0, 'u1', 0);
         INSERT INTO classes (id, title, main_id, sort_order, created_by, created_at)
            VALUES ('c1', 'Class', 'm1', 0, 'u1', 0);
         INSERT INTO classes (id, title, main_id, parent_class_id, sort_order, created_by, created_at)
            VALUES ('c2', 'Sub', 'm1', 'c1', 0, 'u1', 0);
         INSERT INTO lessons (id, title, content, class_id, sort_order, is_published, created_by, created_at, updated_at)
            VALUES ('l1', 'Lesson', 'Body', 'c2', 0, 1, 'u1', 0, 0);
         INSERT INTO user_progress (id, user_id, lesson_id, created_at, updated_at)
            VALUES ('p1', 'u1', 'l1', 0, 0);",
    )
    .unwrap();

    // When: The main topic is deleted
    conn.execute("DELETE FROM main_topics WHERE id = 'm1'", [])
        .unwrap();

    // Then: Nothing below it survives, but the user does
    for table in ["classes", "lessons", "user_progress"] {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 0, "{} should be empty", table);
    }
    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .unwrap();
    assert_eq!(users, 1);
}
