use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use yt_sheets::commands::{self, SearchOptions};
use yt_sheets::config::load_env;
use yt_sheets::models::{DEFAULT_MAX_RESULTS, DurationBucket};

#[derive(Parser)]
#[command(name = "yt-sheets")]
#[command(about = "Search YouTube for videos and save the ranked results to a Google Sheet")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// Search query
    query: String,

    /// Only videos published in the last N days (1-90)
    #[arg(short, long, default_value = "7")]
    days: u32,

    /// Video length: any, medium (4-20 min) or long (20+ min)
    #[arg(short = 'D', long, default_value = "any")]
    duration: DurationBucket,

    /// Audio language code; an empty string disables the language filter
    #[arg(short, long, default_value = "pt")]
    language: String,

    /// Maximum number of search results (1-50)
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: u32,
}

impl From<FilterArgs> for SearchOptions {
    fn from(args: FilterArgs) -> Self {
        SearchOptions {
            query: args.query,
            days: args.days,
            duration: args.duration,
            language: args.language,
            max_results: args.max_results,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the YouTube API key and Google service account
    Init {
        /// YouTube Data API key
        #[arg(short = 'k', long)]
        api_key: Option<String>,

        /// Path to the Google service account JSON key
        #[arg(short, long)]
        service_account: Option<PathBuf>,

        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Search YouTube and print videos ranked by views
    Search {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Search YouTube and save the ranked videos to a new spreadsheet tab
    Save {
        #[command(flatten)]
        filter: FilterArgs,

        /// Name of the Google spreadsheet
        #[arg(short, long, default_value = "Videos YouTube")]
        sheet: String,

        /// Print the tab instead of writing to Google Sheets
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    // Load environment variables
    load_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            api_key,
            service_account,
            force,
        } => commands::init::run(api_key, service_account, force),
        Commands::Search { filter, json } => commands::search::run(&filter.into(), json).await,
        Commands::Save {
            filter,
            sheet,
            dry_run,
        } => commands::save::run(&filter.into(), &sheet, dry_run).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
