// File-backed SQLite: data survives reopening, and the configured backend
// opens through `connect`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use studyhub_core::commands::{NewClass, NewLesson, NewMainTopic, NewUser, ProgressUpdate};
use studyhub_core::{Repository, Visibility};
use studyhub_store::{connect, SqliteRepository, StoreConfig};
use tempfile::TempDir;

fn new_user() -> NewUser {
    NewUser {
        email: "reader@example.com".to_string(),
        full_name: "Reader".to_string(),
        is_admin: false,
    }
}

#[tokio::test]
async fn test_reopened_file_keeps_tree_and_progress() {
    // Given: A database file with a small tree and some progress
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("store.db");
    let (user_id, lesson_id) = {
        let repo = SqliteRepository::open(&path).unwrap();
        let user = repo.create_user(new_user()).await.unwrap();
        let main = repo
            .create_main(NewMainTopic {
                title: "People of God".to_string(),
                description: None,
                icon: None,
                order: 0,
                created_by: user.id.clone(),
            })
            .await
            .unwrap();
        let class = repo
            .create_class(NewClass {
                title: "Righteous People".to_string(),
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
                title: "Abraham".to_string(),
                content: "<p>Faith</p>".to_string(),
                excerpt: None,
                bible_reference: Some("Genesis 12:1-9".to_string()),
                image_url: None,
                audio_url: None,
                duration: Some(15),
                class_id: class.id.clone(),
                order: 0,
                is_published: true,
                created_by: user.id.clone(),
            })
            .await
            .unwrap();
        repo.update_user_progress(
            ProgressUpdate::new(&user.id, &lesson.id)
                .bookmarked(true)
                .study_time(15),
        )
        .await
        .unwrap();
        (user.id, lesson.id)
    };

    // When: The file is opened again through the configured backend
    let repo = connect(&StoreConfig::sqlite(&path)).await.unwrap();

    // Then: The tree and the progress are still there
    let mains = repo
        .list_mains(Visibility::Published, Some(&user_id))
        .await
        .unwrap();
    assert_eq!(mains.len(), 1);
    let lesson = &mains[0].classes[0].lessons[0];
    assert_eq!(lesson.lesson.id, lesson_id);
    assert_eq!(lesson.lesson.duration, Some(15));
    let progress = lesson.progress.as_ref().expect("progress should be merged");
    assert!(progress.bookmarked);
    assert_eq!(progress.study_time, 15);
}

#[tokio::test]
async fn test_reopening_does_not_reapply_migrations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");

    drop(SqliteRepository::open(&path).unwrap());
    drop(SqliteRepository::open(&path).unwrap());

    let conn = rusqlite::Connection::open(&path).unwrap();
    assert_eq!(
        studyhub_store::migrations::applied_migrations(&conn).unwrap(),
        vec!["001_initial_schema".to_string()]
    );
}
