#![allow(clippy::unwrap_used, clippy::expect_used)]

use studyhub_core::seed::{seed_sample_content, SeedOutcome, ADMIN_EMAIL};
use studyhub_core::{MemoryRepository, Repository};

#[tokio::test]
async fn test_seed_creates_sample_tree() {
    // Given: an empty repository
    let repo = MemoryRepository::new();

    // When: seeding
    let outcome = seed_sample_content(&repo).await.unwrap();

    // Then: the admin, one topic, two classes and two published lessons exist
    let SeedOutcome::Seeded {
        admin_id,
        main_id,
        class_ids,
        lesson_ids,
    } = outcome
    else {
        panic!("expected a fresh seed");
    };
    assert_eq!(class_ids.len(), 2);
    assert_eq!(lesson_ids.len(), 2);

    let admin = repo.get_user_by_email(ADMIN_EMAIL).await.unwrap().unwrap();
    assert_eq!(admin.id, admin_id);
    assert!(admin.is_admin);

    let mains = repo.get_mains().await.unwrap();
    assert_eq!(mains.len(), 1);
    assert_eq!(mains[0].main.id, main_id);
    assert_eq!(mains[0].main.title, "People of God in the Bible");

    let titles: Vec<&str> = mains[0]
        .classes
        .iter()
        .map(|c| c.class.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Righteous People", "Wicked People"]);
    assert_eq!(mains[0].classes[0].lessons.len(), 2);
    assert!(mains[0].classes[1].lessons.is_empty());

    let hits = repo.search_lessons("genesis", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].lesson.title.starts_with("Abraham"));
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let repo = MemoryRepository::new();
    seed_sample_content(&repo).await.unwrap();

    let again = seed_sample_content(&repo).await.unwrap();

    assert!(matches!(again, SeedOutcome::AlreadySeeded { .. }));
    assert_eq!(repo.list_users().await.unwrap().len(), 1);
    assert_eq!(repo.get_mains().await.unwrap().len(), 1);
}

#[test]
fn test_outcome_serializes_with_status_tag() {
    let json = serde_json::to_value(SeedOutcome::AlreadySeeded {
        admin_id: "u1".to_string(),
    })
    .unwrap();
    assert_eq!(json["status"], "already_seeded");
    assert_eq!(json["adminId"], "u1");
}
