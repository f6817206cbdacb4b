//! StudyHub CLI
//!
//! Command-line access to the content store: migrations, sample content,
//! tree and lesson reads, search and per-user progress. Results are printed
//! to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use studyhub_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "studyhub")]
#[command(about = "StudyHub - Bible study content store", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: commands::StoreArgs,

    /// Human-readable debug logs instead of JSON
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    Migrate,
    /// Insert the sample content (skipped when the admin account exists)
    Seed,
    /// Print main topics with their classes and lessons
    Tree(commands::tree::TreeArgs),
    /// Print the lessons of one class
    Lessons(commands::lessons::LessonsArgs),
    /// Search published lessons
    Search(commands::search::SearchArgs),
    /// Record progress for a user on a lesson
    Progress(commands::progress::ProgressArgs),
    /// Print a user's bookmarked lessons
    Bookmarks(commands::progress::UserArgs),
    /// Print a user's completed lessons
    Completed(commands::progress::UserArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging_facility::init(if cli.verbose {
        Profile::Development
    } else {
        Profile::Production
    });

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.store.resolve()?;
    tracing::debug!(backend = ?config.backend, "resolved store config");

    match cli.command {
        Commands::Migrate => commands::migrate::execute(&config).await,
        Commands::Seed => commands::seed::execute(&config).await,
        Commands::Tree(args) => commands::tree::execute(&config, args).await,
        Commands::Lessons(args) => commands::lessons::execute(&config, args).await,
        Commands::Search(args) => commands::search::execute(&config, args).await,
        Commands::Progress(args) => commands::progress::execute(&config, args).await,
        Commands::Bookmarks(args) => commands::progress::bookmarks(&config, args).await,
        Commands::Completed(args) => commands::progress::completed(&config, args).await,
    }
}
