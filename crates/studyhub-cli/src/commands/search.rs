//! Lesson search command
//!
//! Usage: studyhub search <QUERY> [--user <ID>]

use clap::Args;
use studyhub_core::Repository;
use studyhub_store::StoreConfig;

use super::{open, print_json, CommandResult};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Case-insensitive text; empty lists every published lesson
    #[arg(default_value = "")]
    pub query: String,

    /// Merge this user's progress into each hit
    #[arg(long)]
    pub user: Option<String>,
}

pub async fn execute(config: &StoreConfig, args: SearchArgs) -> CommandResult {
    let repo = open(config).await?;
    let hits = repo
        .search_lessons(&args.query, args.user.as_deref())
        .await?;
    print_json(&hits)
}
