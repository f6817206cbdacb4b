//! Progress commands
//!
//! Usage: studyhub progress <USER_ID> <LESSON_ID> [--completed <BOOL>]
//!            [--bookmarked <BOOL>] [--study-time <MINUTES>]
//!            [--notes <TEXT> | --clear-notes]
//!        studyhub bookmarks <USER_ID>
//!        studyhub completed <USER_ID>

use clap::Args;
use studyhub_core::commands::ProgressUpdate;
use studyhub_core::Repository;
use studyhub_store::StoreConfig;

use super::{open, print_json, CommandResult};

#[derive(Debug, Args)]
pub struct ProgressArgs {
    pub user_id: String,

    pub lesson_id: String,

    #[arg(long)]
    pub completed: Option<bool>,

    #[arg(long)]
    pub bookmarked: Option<bool>,

    /// Accumulated minutes; lower than the stored total is ignored
    #[arg(long)]
    pub study_time: Option<i32>,

    #[arg(long, conflicts_with = "clear_notes")]
    pub notes: Option<String>,

    /// Remove stored notes
    #[arg(long)]
    pub clear_notes: bool,
}

impl ProgressArgs {
    fn into_update(self) -> ProgressUpdate {
        let notes = if self.clear_notes {
            Some(None)
        } else {
            self.notes.map(Some)
        };
        ProgressUpdate {
            user_id: self.user_id,
            lesson_id: self.lesson_id,
            completed: self.completed,
            bookmarked: self.bookmarked,
            study_time: self.study_time,
            notes,
        }
    }
}

#[derive(Debug, Args)]
pub struct UserArgs {
    pub user_id: String,
}

pub async fn execute(config: &StoreConfig, args: ProgressArgs) -> CommandResult {
    let repo = open(config).await?;
    let record = repo.update_user_progress(args.into_update()).await?;
    print_json(&record)
}

pub async fn bookmarks(config: &StoreConfig, args: UserArgs) -> CommandResult {
    let repo = open(config).await?;
    print_json(&repo.get_user_bookmarks(&args.user_id).await?)
}

pub async fn completed(config: &StoreConfig, args: UserArgs) -> CommandResult {
    let repo = open(config).await?;
    print_json(&repo.get_user_completed_lessons(&args.user_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ProgressArgs {
        ProgressArgs {
            user_id: "u1".to_string(),
            lesson_id: "l1".to_string(),
            completed: None,
            bookmarked: Some(true),
            study_time: None,
            notes: None,
            clear_notes: false,
        }
    }

    #[test]
    fn test_absent_notes_are_left_alone() {
        let update = args().into_update();
        assert_eq!(update.notes, None);
        assert_eq!(update.bookmarked, Some(true));
    }

    #[test]
    fn test_clear_notes_sends_explicit_null() {
        let update = ProgressArgs {
            clear_notes: true,
            ..args()
        }
        .into_update();
        assert_eq!(update.notes, Some(None));
    }

    #[test]
    fn test_notes_are_replaced() {
        let update = ProgressArgs {
            notes: Some("Genesis 12".to_string()),
            ..args()
        }
        .into_update();
        assert_eq!(update.notes, Some(Some("Genesis 12".to_string())));
    }
}
