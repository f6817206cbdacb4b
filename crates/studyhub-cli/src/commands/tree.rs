//! Content tree command
//!
//! Usage: studyhub tree [--main <ID>] [--class <ID>] [--all] [--user <ID>]

use clap::Args;
use studyhub_core::{Repository, Visibility};
use studyhub_store::StoreConfig;

use super::{open, print_json, CommandResult};

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Only this main topic
    #[arg(long, conflicts_with = "class")]
    pub main: Option<String>,

    /// Only this class and its sub-classes
    #[arg(long)]
    pub class: Option<String>,

    /// Include unpublished lessons
    #[arg(long)]
    pub all: bool,

    /// Merge this user's progress into each lesson
    #[arg(long)]
    pub user: Option<String>,
}

impl TreeArgs {
    fn visibility(&self) -> Visibility {
        if self.all {
            Visibility::All
        } else {
            Visibility::Published
        }
    }
}

pub async fn execute(config: &StoreConfig, args: TreeArgs) -> CommandResult {
    let repo = open(config).await?;
    let visibility = args.visibility();
    let user = args.user.as_deref();

    if let Some(class_id) = &args.class {
        return match repo.find_class(class_id, visibility, user).await? {
            Some(class) => print_json(&class),
            None => Err(format!("class not found: {}", class_id).into()),
        };
    }
    if let Some(main_id) = &args.main {
        return match repo.find_main(main_id, visibility, user).await? {
            Some(main) => print_json(&main),
            None => Err(format!("main topic not found: {}", main_id).into()),
        };
    }
    print_json(&repo.list_mains(visibility, user).await?)
}
