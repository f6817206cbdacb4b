#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use studyhub_core::errors::{ExError, ExErrorKind};
use studyhub_core::logging_facility::test_capture::init_test_capture;
use studyhub_core::studyhub_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use studyhub_core::{log_op_end, log_op_error, log_op_start};
use studyhub_core::{LoggedRepository, Repository, Visibility};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, lesson_id = "l1");

    let event = capture.single(op_name, EVENT_START);
    assert_eq!(event.field("lesson_id"), Some("l1"));
    assert!(event.field("component").is_some());
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let event = capture.single(op_name, EVENT_END);
    assert_eq!(event.field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = ExError::new(ExErrorKind::ConstraintViolation).with_message("duplicate");
    log_op_error!(op_name, err, duration_ms = 10);

    let event = capture.single(op_name, EVENT_END_ERROR);
    assert_eq!(event.level, tracing::Level::ERROR);
    assert_eq!(event.field("err_code"), Some("ERR_CONSTRAINT_VIOLATION"));
    assert_eq!(event.field("err_kind"), Some("ConstraintViolation"));
}

#[tokio::test]
async fn test_logged_repository_emits_boundary_events() {
    // Given: a logged in-memory repository with one lesson
    let capture = init_test_capture();
    let (inner, _user, _main, class) = common::scaffold().await;
    common::create_lesson(&inner, &class, "Abraham").await;
    let repo = LoggedRepository::new(inner);

    // When: a collection read succeeds
    let lessons = repo.get_lessons(&class.id, None).await.unwrap();
    assert_eq!(lessons.len(), 1);

    // Then: one start and one end event, the end carrying the result size
    let start = capture.single("list_lessons", EVENT_START);
    assert_eq!(start.field("class_id"), Some(class.id.as_str()));
    let end = capture.single("list_lessons", EVENT_END);
    assert_eq!(end.field("result_len"), Some("1"));
    assert!(end.field("duration_ms").is_some());

    // When: a write fails on a constraint
    let err = repo
        .create_user(common::new_user("owner@example.com"))
        .await
        .unwrap_err();
    assert!(err.is_constraint_violation());

    // Then: the error event carries the code and the email is masked
    let failure = capture.single("create_user", EVENT_END_ERROR);
    assert_eq!(failure.field("err_code"), Some("ERR_CONSTRAINT_VIOLATION"));
    let start = capture.single("create_user", EVENT_START);
    assert_eq!(start.field("email"), Some("o***@example.com"));
    assert!(capture
        .events_for("create_user")
        .iter()
        .all(|e| !e.mentions("owner@")));
}

#[tokio::test]
async fn test_logged_repository_returns_inner_results() {
    // Given: the same in-memory repository reachable directly and decorated
    let (inner, user, main, class) = common::scaffold().await;
    let lesson = common::create_lesson(&inner, &class, "Moses").await;
    let inner = Arc::new(inner);
    let repo = LoggedRepository::new(inner.clone());

    // When / Then: reads through the decorator match the undecorated ones
    assert_eq!(
        repo.find_main(&main.id, Visibility::All, Some(&user.id))
            .await
            .unwrap(),
        inner
            .find_main(&main.id, Visibility::All, Some(&user.id))
            .await
            .unwrap()
    );
    assert_eq!(
        repo.get_lesson_by_id(&lesson.id, None).await.unwrap(),
        inner.get_lesson_by_id(&lesson.id, None).await.unwrap()
    );

    // And: writes through the decorator land in the inner store
    repo.delete_lesson(&lesson.id).await.unwrap();
    assert!(inner.get_lesson_by_id(&lesson.id, None).await.unwrap().is_none());
}
