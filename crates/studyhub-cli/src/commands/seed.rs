//! Sample content command
//!
//! Usage: studyhub seed

use studyhub_core::seed::seed_sample_content;
use studyhub_store::StoreConfig;

use super::{open, print_json, CommandResult};

pub async fn execute(config: &StoreConfig) -> CommandResult {
    let repo = open(config).await?;
    let outcome = seed_sample_content(&repo).await?;
    print_json(&outcome)
}
