//! Shared test support: payload fixtures and the cross-backend conformance
//! suite. Compiled for this crate's own tests and, through the `testing`
//! feature, for the backend crates' tests.

pub mod conformance;
pub mod fixtures;

use crate::repository::Repository;

/// Owner of a repository that needs setup or teardown around each check,
/// such as exclusive access to a shared database
pub trait Harness {
    fn repository(&self) -> &dyn Repository;
}

/// Generate one `#[tokio::test]` per conformance check
///
/// - `fresh: <expr>` evaluates the expression to a new, empty repository
///   for every test;
/// - `optional: <expr>` awaits the expression to an `Option` of a
///   [`Harness`] and skips the test when it is `None`.
///
/// ```ignore
/// studyhub_core::conformance_tests!(fresh: MemoryRepository::new());
/// ```
#[macro_export]
macro_rules! conformance_tests {
    (fresh: $make:expr) => {
        $crate::conformance_tests!(@each fresh $make;
            end_to_end_tree_and_progress,
            tree_is_referentially_consistent,
            leaf_classes_have_no_sub_classes,
            classes_nest_recursively,
            progress_update_is_idempotent,
            completed_at_is_set_once,
            sequential_updates_merge_into_one_record,
            progress_fields_keep_or_clear,
            delete_main_cascades,
            delete_class_cascades_to_sub_classes,
            delete_lesson_removes_progress,
            deleting_missing_rows_returns_false,
            search_returns_published_only,
            search_is_case_insensitive_newest_first,
            blank_search_returns_all_published,
            search_treats_wildcards_literally,
            search_folds_non_ascii_case,
            search_merges_user_progress,
            missing_lesson_is_none,
            lesson_by_id_includes_drafts_and_progress,
            visibility_gates_drafts,
            progress_is_per_user,
            sibling_ties_keep_insertion_order,
            bookmarks_most_recently_touched_first,
            completed_most_recent_first,
            duplicate_email_is_constraint_violation,
            dangling_references_are_constraint_violations,
            partial_updates,
            records_round_trip,
        );
    };
    (optional: $make:expr) => {
        $crate::conformance_tests!(@each optional $make;
            end_to_end_tree_and_progress,
            tree_is_referentially_consistent,
            leaf_classes_have_no_sub_classes,
            classes_nest_recursively,
            progress_update_is_idempotent,
            completed_at_is_set_once,
            sequential_updates_merge_into_one_record,
            progress_fields_keep_or_clear,
            delete_main_cascades,
            delete_class_cascades_to_sub_classes,
            delete_lesson_removes_progress,
            deleting_missing_rows_returns_false,
            search_returns_published_only,
            search_is_case_insensitive_newest_first,
            blank_search_returns_all_published,
            search_treats_wildcards_literally,
            search_folds_non_ascii_case,
            search_merges_user_progress,
            missing_lesson_is_none,
            lesson_by_id_includes_drafts_and_progress,
            visibility_gates_drafts,
            progress_is_per_user,
            sibling_ties_keep_insertion_order,
            bookmarks_most_recently_touched_first,
            completed_most_recent_first,
            duplicate_email_is_constraint_violation,
            dangling_references_are_constraint_violations,
            partial_updates,
            records_round_trip,
        );
    };
    (@each fresh $make:expr; $($check:ident),* $(,)?) => {
        $(
            #[tokio::test]
            async fn $check() {
                let repo = $make;
                $crate::testing::conformance::$check(&repo).await;
            }
        )*
    };
    (@each optional $make:expr; $($check:ident),* $(,)?) => {
        $(
            #[tokio::test]
            async fn $check() {
                let Some(harness) = $make.await else {
                    eprintln!("skipping {}: no database configured", stringify!($check));
                    return;
                };
                $crate::testing::conformance::$check(
                    $crate::testing::Harness::repository(&harness),
                )
                .await;
            }
        )*
    };
}
