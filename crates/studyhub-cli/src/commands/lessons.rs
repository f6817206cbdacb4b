//! Lesson listing command
//!
//! Usage: studyhub lessons <CLASS_ID> [--all] [--user <ID>]
//!        studyhub lessons --id <LESSON_ID> [--user <ID>]

use clap::Args;
use studyhub_core::{Repository, Visibility};
use studyhub_store::StoreConfig;

use super::{open, print_json, CommandResult};

#[derive(Debug, Args)]
pub struct LessonsArgs {
    /// Class whose lessons to list
    #[arg(required_unless_present = "id", conflicts_with = "id")]
    pub class_id: Option<String>,

    /// Print one lesson, published or not
    #[arg(long)]
    pub id: Option<String>,

    /// Include unpublished lessons
    #[arg(long)]
    pub all: bool,

    /// Merge this user's progress into each lesson
    #[arg(long)]
    pub user: Option<String>,
}

pub async fn execute(config: &StoreConfig, args: LessonsArgs) -> CommandResult {
    let repo = open(config).await?;
    let user = args.user.as_deref();

    if let Some(id) = &args.id {
        return match repo.get_lesson_by_id(id, user).await? {
            Some(lesson) => print_json(&lesson),
            None => Err(format!("lesson not found: {}", id).into()),
        };
    }

    let class_id = args.class_id.as_deref().unwrap_or_default();
    let visibility = if args.all {
        Visibility::All
    } else {
        Visibility::Published
    };
    print_json(&repo.list_lessons(class_id, visibility, user).await?)
}
