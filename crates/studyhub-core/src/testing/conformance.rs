//! Behaviour every backend must share
//!
//! Each check takes an empty repository and panics on the first mismatch.
//! Backends run the whole list through [`conformance_tests!`](crate::conformance_tests).

use std::time::Duration;

use super::fixtures::{new_class, new_draft, new_lesson, new_main, new_sub_class, new_user, Scaffold};
use crate::commands::{ClassPatch, LessonPatch, MainTopicPatch, NewLesson, ProgressUpdate, UserPatch};
use crate::errors::ExErrorKind;
use crate::model::{MainWithClasses, UserProgress};
use crate::repository::{Repository, Visibility};

/// Separate two writes so their timestamps cannot collide
async fn pause() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

fn assert_consistent(main: &MainWithClasses) {
    for class in main.all_classes() {
        assert_eq!(class.class.main_id, main.main.id);
        assert_ne!(class.sub_classes.as_ref().map(Vec::len), Some(0));
        for lesson in &class.lessons {
            assert_eq!(lesson.lesson.class_id, class.class.id);
        }
        for sub in class.sub_classes.iter().flatten() {
            assert_eq!(sub.class.parent_class_id.as_deref(), Some(class.class.id.as_str()));
        }
    }
}

fn without_updated_at(mut progress: UserProgress) -> UserProgress {
    progress.updated_at = progress.created_at;
    progress
}

pub async fn end_to_end_tree_and_progress(repo: &dyn Repository) {
    // Given: a main topic "Test" with one class and one published lesson
    let s = Scaffold::create(repo, "reader@example.com").await.unwrap();
    let lesson = s.lesson(repo, "Abraham").await.unwrap();

    // When: the public tree is read
    let mains = repo.get_mains().await.unwrap();

    // Then: exactly that lesson is reachable
    assert_eq!(mains.len(), 1);
    assert_eq!(mains[0].main.title, "Test");
    assert_eq!(mains[0].classes.len(), 1);
    assert_eq!(mains[0].classes[0].lessons.len(), 1);
    assert_eq!(mains[0].classes[0].lessons[0].lesson, lesson);
    assert!(mains[0].classes[0].lessons[0].progress.is_none());

    // When: the user completes it
    repo.update_user_progress(ProgressUpdate::new(&s.user.id, &lesson.id).completed(true))
        .await
        .unwrap();

    // Then: the user's lesson list carries the progress
    let lessons = repo
        .get_lessons(&s.class.id, Some(&s.user.id))
        .await
        .unwrap();
    let progress = lessons[0].progress.as_ref().unwrap();
    assert!(progress.completed);
    assert!(progress.completed_at.is_some());
}

pub async fn tree_is_referentially_consistent(repo: &dyn Repository) {
    // Given: two main topics with nested classes under each
    let s = Scaffold::create(repo, "author@example.com").await.unwrap();
    let other = repo.create_main(new_main("Other", &s.user.id)).await.unwrap();
    let sub = repo
        .create_class(new_sub_class("Sub", &s.class, &s.user.id))
        .await
        .unwrap();
    let other_class = repo
        .create_class(new_class("Elsewhere", &other.id, &s.user.id))
        .await
        .unwrap();
    s.lesson(repo, "Top lesson").await.unwrap();
    repo.create_lesson(new_lesson("Sub lesson", &sub.id, &s.user.id))
        .await
        .unwrap();
    repo.create_lesson(new_lesson("Other lesson", &other_class.id, &s.user.id))
        .await
        .unwrap();

    // When / Then: every class and lesson sits under the right parent
    let mains = repo.get_mains().await.unwrap();
    assert_eq!(mains.len(), 2);
    for main in &mains {
        assert_consistent(main);
    }

    let main = repo.get_main_by_id(&s.main.id).await.unwrap().unwrap();
    assert_eq!(main.classes.len(), 1);
    let nested = main.classes[0].sub_classes.as_ref().unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].class.id, sub.id);
    assert_eq!(nested[0].lessons[0].lesson.title, "Sub lesson");
}

pub async fn leaf_classes_have_no_sub_classes(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "leaf@example.com").await.unwrap();
    repo.create_class(new_class("Second", &s.main.id, &s.user.id))
        .await
        .unwrap();

    let classes = repo.get_classes(&s.main.id).await.unwrap();
    assert_eq!(classes.len(), 2);
    assert!(classes.iter().all(|c| c.sub_classes.is_none()));
}

pub async fn classes_nest_recursively(repo: &dyn Repository) {
    // Given: class -> sub -> sub-sub
    let s = Scaffold::create(repo, "nest@example.com").await.unwrap();
    let sub = repo
        .create_class(new_sub_class("Sub", &s.class, &s.user.id))
        .await
        .unwrap();
    let deepest = repo
        .create_class(new_sub_class("Deepest", &sub, &s.user.id))
        .await
        .unwrap();

    // When: listing the main topic's classes
    let classes = repo.get_classes(&s.main.id).await.unwrap();

    // Then: only the top-level class is listed, the rest hang below it
    assert_eq!(classes.len(), 1);
    let level1 = &classes[0].sub_classes.as_ref().unwrap()[0];
    let level2 = &level1.sub_classes.as_ref().unwrap()[0];
    assert_eq!(level1.class.id, sub.id);
    assert_eq!(level2.class.id, deepest.id);
    assert!(level2.sub_classes.is_none());

    // And: a sub-class can be read as its own subtree
    let subtree = repo.get_class_by_id(&sub.id).await.unwrap().unwrap();
    assert_eq!(subtree.sub_classes.unwrap()[0].class.id, deepest.id);
    assert!(repo.get_class_by_id("missing").await.unwrap().is_none());
}

pub async fn progress_update_is_idempotent(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "idem@example.com").await.unwrap();
    let lesson = s.lesson(repo, "Abraham").await.unwrap();
    let update = ProgressUpdate::new(&s.user.id, &lesson.id)
        .completed(true)
        .study_time(15)
        .notes(Some("Genesis 12".to_string()));

    let first = repo.update_user_progress(update.clone()).await.unwrap();
    let second = repo.update_user_progress(update).await.unwrap();

    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.completed_at, first.completed_at);
    assert_eq!(without_updated_at(second), without_updated_at(first));
}

pub async fn completed_at_is_set_once(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "once@example.com").await.unwrap();
    let lesson = s.lesson(repo, "Moses").await.unwrap();
    let key = ProgressUpdate::new(&s.user.id, &lesson.id);

    let created = repo
        .update_user_progress(key.clone().bookmarked(true))
        .await
        .unwrap();
    assert!(created.completed_at.is_none());

    let done = repo
        .update_user_progress(key.clone().completed(true))
        .await
        .unwrap();
    let stamp = done.completed_at;
    assert!(stamp.is_some());

    pause().await;
    let undone = repo
        .update_user_progress(key.clone().completed(false))
        .await
        .unwrap();
    assert!(!undone.completed);
    assert_eq!(undone.completed_at, stamp);

    let redone = repo
        .update_user_progress(key.completed(true))
        .await
        .unwrap();
    assert_eq!(redone.completed_at, stamp);
}

pub async fn sequential_updates_merge_into_one_record(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "merge@example.com").await.unwrap();
    let lesson = s.lesson(repo, "Abraham").await.unwrap();

    let first = repo
        .update_user_progress(ProgressUpdate::new(&s.user.id, &lesson.id).bookmarked(true))
        .await
        .unwrap();
    let second = repo
        .update_user_progress(ProgressUpdate::new(&s.user.id, &lesson.id).completed(true))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.created_at, first.created_at);
    assert!(second.bookmarked && second.completed);

    let stored = repo
        .get_user_progress(&s.user.id, &lesson.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, second);
}

pub async fn progress_fields_keep_or_clear(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "fields@example.com").await.unwrap();
    let lesson = s.lesson(repo, "Abraham").await.unwrap();
    let key = ProgressUpdate::new(&s.user.id, &lesson.id);

    let fresh = repo.update_user_progress(key.clone()).await.unwrap();
    assert!(!fresh.completed && !fresh.bookmarked);
    assert_eq!(fresh.study_time, 0);
    assert_eq!(fresh.notes, None);

    repo.update_user_progress(
        key.clone()
            .study_time(30)
            .notes(Some("Faith that waits".to_string())),
    )
    .await
    .unwrap();
    let kept = repo
        .update_user_progress(key.clone().study_time(10))
        .await
        .unwrap();
    assert_eq!(kept.study_time, 30);
    assert_eq!(kept.notes.as_deref(), Some("Faith that waits"));

    let cleared = repo.update_user_progress(key.notes(None)).await.unwrap();
    assert_eq!(cleared.notes, None);
    assert_eq!(cleared.study_time, 30);
}

pub async fn delete_main_cascades(repo: &dyn Repository) {
    // Given: a main topic with a nested class, lessons and progress
    let s = Scaffold::create(repo, "cascade@example.com").await.unwrap();
    let sub = repo
        .create_class(new_sub_class("Sub", &s.class, &s.user.id))
        .await
        .unwrap();
    let top = s.lesson(repo, "Top").await.unwrap();
    let deep = repo
        .create_lesson(new_lesson("Deep", &sub.id, &s.user.id))
        .await
        .unwrap();
    repo.update_user_progress(ProgressUpdate::new(&s.user.id, &deep.id).bookmarked(true))
        .await
        .unwrap();

    // When: the main topic is deleted
    assert!(repo.delete_main(&s.main.id).await.unwrap());

    // Then: nothing below it is retrievable
    assert!(repo.get_main_by_id(&s.main.id).await.unwrap().is_none());
    assert!(repo.get_class_by_id(&s.class.id).await.unwrap().is_none());
    assert!(repo.get_class_by_id(&sub.id).await.unwrap().is_none());
    assert!(repo.get_lesson_by_id(&top.id, None).await.unwrap().is_none());
    assert!(repo.get_lesson_by_id(&deep.id, None).await.unwrap().is_none());
    assert!(repo
        .get_user_progress(&s.user.id, &deep.id)
        .await
        .unwrap()
        .is_none());
    assert!(repo.get_user_bookmarks(&s.user.id).await.unwrap().is_empty());
    assert!(repo.get_mains().await.unwrap().is_empty());

    // And: the user survives
    assert!(repo.get_user_by_id(&s.user.id).await.unwrap().is_some());
}

pub async fn delete_class_cascades_to_sub_classes(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "subtree@example.com").await.unwrap();
    let sub = repo
        .create_class(new_sub_class("Sub", &s.class, &s.user.id))
        .await
        .unwrap();
    let sibling = repo
        .create_class(new_class("Sibling", &s.main.id, &s.user.id))
        .await
        .unwrap();
    let deep = repo
        .create_lesson(new_lesson("Deep", &sub.id, &s.user.id))
        .await
        .unwrap();
    let kept = repo
        .create_lesson(new_lesson("Kept", &sibling.id, &s.user.id))
        .await
        .unwrap();

    assert!(repo.delete_class(&s.class.id).await.unwrap());

    assert!(repo.get_class_by_id(&sub.id).await.unwrap().is_none());
    assert!(repo.get_lesson_by_id(&deep.id, None).await.unwrap().is_none());
    assert!(repo.get_lesson_by_id(&kept.id, None).await.unwrap().is_some());
    let classes = repo.get_classes(&s.main.id).await.unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].class.id, sibling.id);
}

pub async fn delete_lesson_removes_progress(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "lesson-del@example.com").await.unwrap();
    let lesson = s.lesson(repo, "Gone").await.unwrap();
    repo.update_user_progress(ProgressUpdate::new(&s.user.id, &lesson.id).completed(true))
        .await
        .unwrap();

    assert!(repo.delete_lesson(&lesson.id).await.unwrap());
    assert!(repo
        .get_user_progress(&s.user.id, &lesson.id)
        .await
        .unwrap()
        .is_none());
    assert!(repo
        .get_user_completed_lessons(&s.user.id)
        .await
        .unwrap()
        .is_empty());
}

pub async fn deleting_missing_rows_returns_false(repo: &dyn Repository) {
    assert!(!repo.delete_main("missing").await.unwrap());
    assert!(!repo.delete_class("missing").await.unwrap());
    assert!(!repo.delete_lesson("missing").await.unwrap());
}

pub async fn search_returns_published_only(repo: &dyn Repository) {
    // Given: "faith" in a published excerpt and in an unpublished title
    let s = Scaffold::create(repo, "search@example.com").await.unwrap();
    let published = repo
        .create_lesson(NewLesson {
            excerpt: Some("A man of faith".to_string()),
            ..new_lesson("Abraham", &s.class.id, &s.user.id)
        })
        .await
        .unwrap();
    repo.create_lesson(new_draft("Faith draft", &s.class.id, &s.user.id))
        .await
        .unwrap();

    // When / Then: only the published lesson matches
    let hits = repo.search_lessons("faith", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].lesson.id, published.id);
}

pub async fn search_is_case_insensitive_newest_first(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "order@example.com").await.unwrap();
    let mut ids = Vec::new();
    for (title, reference) in [
        ("Abraham", "Genesis 12"),
        ("Isaac", "Genesis 22"),
        ("Moses", "Exodus 3"),
        ("Jacob", "Genesis 28"),
    ] {
        let lesson = repo
            .create_lesson(NewLesson {
                bible_reference: Some(reference.to_string()),
                ..new_lesson(title, &s.class.id, &s.user.id)
            })
            .await
            .unwrap();
        ids.push(lesson.id);
    }

    let hits: Vec<String> = repo
        .search_lessons("GENESIS", None)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.lesson.id)
        .collect();
    assert_eq!(hits, vec![ids[3].clone(), ids[1].clone(), ids[0].clone()]);

    let content_hits = repo.search_lessons("lesson BODY", None).await.unwrap();
    assert_eq!(content_hits.len(), 4);
}

pub async fn blank_search_returns_all_published(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "blank@example.com").await.unwrap();
    s.lesson(repo, "One").await.unwrap();
    s.lesson(repo, "Two").await.unwrap();
    repo.create_lesson(new_draft("Hidden", &s.class.id, &s.user.id))
        .await
        .unwrap();

    assert_eq!(repo.search_lessons("", None).await.unwrap().len(), 2);
    assert_eq!(repo.search_lessons("   ", None).await.unwrap().len(), 2);
}

pub async fn search_treats_wildcards_literally(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "literal@example.com").await.unwrap();
    let tithe = s.lesson(repo, "Giving 10% back").await.unwrap();
    s.lesson(repo, "Giving 100 coins").await.unwrap();
    let snake = s.lesson(repo, "snake_case names").await.unwrap();
    s.lesson(repo, "snakeXcase names").await.unwrap();

    let percent = repo.search_lessons("10%", None).await.unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].lesson.id, tithe.id);

    let underscore = repo.search_lessons("e_c", None).await.unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].lesson.id, snake.id);
}

pub async fn search_folds_non_ascii_case(repo: &dyn Repository) {
    // Given: accented titles in mixed case
    let s = Scaffold::create(repo, "unicode@example.com").await.unwrap();
    let exodo = s.lesson(repo, "Éxodo y la fe").await.unwrap();
    let romer = repo
        .create_lesson(NewLesson {
            excerpt: Some("ÜBER DEN GLAUBEN".to_string()),
            ..new_lesson("Römer", &s.class.id, &s.user.id)
        })
        .await
        .unwrap();

    // When / Then: a lowercase query finds the uppercase text
    let hits = repo.search_lessons("éxodo", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].lesson.id, exodo.id);

    let hits = repo.search_lessons("über den", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].lesson.id, romer.id);

    // And: an uppercase query finds the lowercase text
    let hits = repo.search_lessons("Y LA FE", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(repo.search_lessons("exodo", None).await.unwrap().is_empty());
}

pub async fn search_merges_user_progress(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "search-progress@example.com").await.unwrap();
    let lesson = s.lesson(repo, "Abraham").await.unwrap();
    repo.update_user_progress(ProgressUpdate::new(&s.user.id, &lesson.id).bookmarked(true))
        .await
        .unwrap();

    let with_user = repo
        .search_lessons("abraham", Some(&s.user.id))
        .await
        .unwrap();
    assert!(with_user[0].progress.as_ref().unwrap().bookmarked);

    let anonymous = repo.search_lessons("abraham", None).await.unwrap();
    assert!(anonymous[0].progress.is_none());
}

pub async fn missing_lesson_is_none(repo: &dyn Repository) {
    assert!(repo
        .get_lesson_by_id("nonexistent-id", None)
        .await
        .unwrap()
        .is_none());
    assert!(repo.get_user_by_id("nonexistent-id").await.unwrap().is_none());
    assert!(repo.get_main_by_id("nonexistent-id").await.unwrap().is_none());
}

pub async fn lesson_by_id_includes_drafts_and_progress(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "drafts@example.com").await.unwrap();
    let draft = repo
        .create_lesson(new_draft("Draft", &s.class.id, &s.user.id))
        .await
        .unwrap();
    repo.update_user_progress(ProgressUpdate::new(&s.user.id, &draft.id).study_time(5))
        .await
        .unwrap();

    let found = repo
        .get_lesson_by_id(&draft.id, Some(&s.user.id))
        .await
        .unwrap()
        .unwrap();
    assert!(!found.lesson.is_published);
    assert_eq!(found.progress.unwrap().study_time, 5);

    let anonymous = repo.get_lesson_by_id(&draft.id, None).await.unwrap().unwrap();
    assert!(anonymous.progress.is_none());
}

pub async fn visibility_gates_drafts(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "visibility@example.com").await.unwrap();
    s.lesson(repo, "Published").await.unwrap();
    repo.create_lesson(new_draft("Draft", &s.class.id, &s.user.id))
        .await
        .unwrap();

    let public = repo.get_lessons(&s.class.id, None).await.unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].lesson.title, "Published");

    let all = repo
        .list_lessons(&s.class.id, Visibility::All, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let public_tree = repo.get_mains().await.unwrap();
    assert_eq!(public_tree[0].classes[0].lessons.len(), 1);
    let full_tree = repo.list_mains(Visibility::All, None).await.unwrap();
    assert_eq!(full_tree[0].classes[0].lessons.len(), 2);
}

pub async fn progress_is_per_user(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "first@example.com").await.unwrap();
    let other = repo.create_user(new_user("second@example.com")).await.unwrap();
    let lesson = s.lesson(repo, "Abraham").await.unwrap();
    repo.update_user_progress(ProgressUpdate::new(&s.user.id, &lesson.id).completed(true))
        .await
        .unwrap();

    let mine = repo
        .get_lessons(&s.class.id, Some(&s.user.id))
        .await
        .unwrap();
    assert!(mine[0].progress.is_some());

    let theirs = repo
        .get_lessons(&s.class.id, Some(&other.id))
        .await
        .unwrap();
    assert!(theirs[0].progress.is_none());

    let tree = repo
        .find_main(&s.main.id, Visibility::Published, Some(&s.user.id))
        .await
        .unwrap()
        .unwrap();
    assert!(tree.classes[0].lessons[0].progress.as_ref().unwrap().completed);
}

pub async fn sibling_ties_keep_insertion_order(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "ties@example.com").await.unwrap();
    for title in ["first", "second", "third"] {
        s.lesson(repo, title).await.unwrap();
    }
    let early = repo
        .create_lesson(NewLesson {
            order: -1,
            ..new_lesson("early", &s.class.id, &s.user.id)
        })
        .await
        .unwrap();

    let titles: Vec<String> = repo
        .get_lessons(&s.class.id, None)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.lesson.title)
        .collect();
    assert_eq!(titles, vec![early.title.as_str(), "first", "second", "third"]);

    let second = repo.create_main(new_main("Second", &s.user.id)).await.unwrap();
    let mains = repo.get_mains().await.unwrap();
    assert_eq!(mains[0].main.id, s.main.id);
    assert_eq!(mains[1].main.id, second.id);
}

pub async fn bookmarks_most_recently_touched_first(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "bookmarks@example.com").await.unwrap();
    let a = s.lesson(repo, "A").await.unwrap();
    let b = s.lesson(repo, "B").await.unwrap();
    let c = s.lesson(repo, "C").await.unwrap();

    for lesson in [&a, &b, &c] {
        repo.update_user_progress(ProgressUpdate::new(&s.user.id, &lesson.id).bookmarked(true))
            .await
            .unwrap();
        pause().await;
    }
    // Unbookmark B, touch A again
    repo.update_user_progress(ProgressUpdate::new(&s.user.id, &b.id).bookmarked(false))
        .await
        .unwrap();
    pause().await;
    repo.update_user_progress(ProgressUpdate::new(&s.user.id, &a.id).study_time(3))
        .await
        .unwrap();

    let ids: Vec<String> = repo
        .get_user_bookmarks(&s.user.id)
        .await
        .unwrap()
        .into_iter()
        .map(|l| {
            assert!(l.progress.as_ref().unwrap().bookmarked);
            l.lesson.id
        })
        .collect();
    assert_eq!(ids, vec![a.id, c.id]);
}

pub async fn completed_most_recent_first(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "completed@example.com").await.unwrap();
    let a = s.lesson(repo, "A").await.unwrap();
    let b = s.lesson(repo, "B").await.unwrap();
    let hidden = s.lesson(repo, "Hidden").await.unwrap();

    for lesson in [&a, &b, &hidden] {
        repo.update_user_progress(ProgressUpdate::new(&s.user.id, &lesson.id).completed(true))
            .await
            .unwrap();
        pause().await;
    }
    // Re-completing A keeps its original completion time
    repo.update_user_progress(ProgressUpdate::new(&s.user.id, &a.id).completed(true))
        .await
        .unwrap();
    // Unpublished lessons drop out of the list
    repo.update_lesson(
        &hidden.id,
        LessonPatch {
            is_published: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let ids: Vec<String> = repo
        .get_user_completed_lessons(&s.user.id)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.lesson.id)
        .collect();
    assert_eq!(ids, vec![b.id, a.id]);
}

pub async fn duplicate_email_is_constraint_violation(repo: &dyn Repository) {
    repo.create_user(new_user("dup@example.com")).await.unwrap();
    let err = repo
        .create_user(new_user("dup@example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);

    // Email match is exact
    assert!(repo
        .get_user_by_email("DUP@example.com")
        .await
        .unwrap()
        .is_none());
    repo.create_user(new_user("DUP@example.com")).await.unwrap();
    assert_eq!(repo.list_users().await.unwrap().len(), 2);
}

pub async fn dangling_references_are_constraint_violations(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "fk@example.com").await.unwrap();

    let err = repo
        .create_class(new_class("Orphan", "missing-main", &s.user.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);

    let err = repo
        .create_lesson(new_lesson("Orphan", "missing-class", &s.user.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);

    let err = repo
        .update_user_progress(ProgressUpdate::new(&s.user.id, "missing-lesson").completed(true))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);

    let err = repo
        .update_class(
            &s.class.id,
            ClassPatch {
                parent_class_id: Some(Some("missing-parent".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);

    // Nothing was written
    let classes = repo.get_classes(&s.main.id).await.unwrap();
    assert_eq!(classes.len(), 1);
    assert!(classes[0].class.parent_class_id.is_none());
}

pub async fn partial_updates(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "patch@example.com").await.unwrap();
    let lesson = s.lesson(repo, "Before").await.unwrap();

    let updated = repo
        .update_lesson(
            &lesson.id,
            LessonPatch {
                title: Some("After".to_string()),
                duration: Some(Some(12)),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "After");
    assert_eq!(updated.duration, Some(12));
    assert_eq!(updated.content, lesson.content);
    assert_eq!(updated.created_at, lesson.created_at);
    assert!(updated.updated_at > lesson.updated_at);

    let main = repo
        .update_main(
            &s.main.id,
            MainTopicPatch {
                description: Some(Some("About".to_string())),
                icon: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(main.description.as_deref(), Some("About"));
    assert_eq!(main.icon, None);
    assert_eq!(main.title, "Test");

    let user = repo
        .update_user(
            &s.user.id,
            UserPatch {
                is_admin: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(user.is_admin);
    assert_eq!(user.email, s.user.email);

    let stored = repo.get_lesson_by_id(&lesson.id, None).await.unwrap().unwrap();
    assert_eq!(stored.lesson, updated);

    assert!(repo
        .update_lesson("missing", LessonPatch::default())
        .await
        .unwrap()
        .is_none());
    assert!(repo
        .update_class("missing", ClassPatch::default())
        .await
        .unwrap()
        .is_none());
}

pub async fn records_round_trip(repo: &dyn Repository) {
    let s = Scaffold::create(repo, "roundtrip@example.com").await.unwrap();
    let lesson = repo
        .create_lesson(NewLesson {
            excerpt: Some("Excerpt".to_string()),
            bible_reference: Some("Genesis 12:1-9".to_string()),
            image_url: Some("https://example.com/a.jpg".to_string()),
            audio_url: Some("https://example.com/a.mp3".to_string()),
            duration: Some(15),
            ..new_lesson("Full", &s.class.id, &s.user.id)
        })
        .await
        .unwrap();

    assert_eq!(
        repo.get_user_by_email("roundtrip@example.com")
            .await
            .unwrap(),
        Some(s.user.clone())
    );
    let stored = repo.get_lesson_by_id(&lesson.id, None).await.unwrap().unwrap();
    assert_eq!(stored.lesson, lesson);
    let main = repo.get_main_by_id(&s.main.id).await.unwrap().unwrap();
    assert_eq!(main.main, s.main);
    assert_eq!(main.classes[0].class, s.class);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::pause;

    #[tokio::test(flavor = "current_thread")]
    async fn test_pause_lets_other_tasks_run() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let task = tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });

        pause().await;

        assert!(ran.load(Ordering::SeqCst));
        task.await.unwrap();
    }
}
