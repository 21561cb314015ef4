use clap::{Parser, Subcommand, builder::styling};
use couchdb_bulk_loader::{
    LoaderConfig,
    cli::{TerminalReporter, format_summary, load_file, test_auth},
};
use eyre::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// CouchDB Bulk Loader: push an NDJSON file into a CouchDB database through concurrent _bulk_docs requests
#[derive(Parser)]
#[command(name = "couchload", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source connection settings from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every line of an NDJSON file as a CouchDB document
    Load {
        /// NDJSON file with one JSON object per line
        file: PathBuf,

        /// Documents per _bulk_docs request [env: COUCHDB_BATCH_SIZE]
        #[arg(short, long, allow_negative_numbers = true)]
        batch_size: Option<i64>,

        /// Requests in flight at once, 0 for no limit [env: COUCHDB_WORKERS]
        #[arg(short, long)]
        workers: Option<usize>,

        /// Per-request timeout in seconds, 0 to disable [env: COUCHDB_TIMEOUT_SECS]
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Reject lines that are not JSON objects instead of sending them as-is
        #[arg(long)]
        strict: bool,

        /// Print the final summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Test the connection and credentials to the CouchDB server
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_loaded = match dotenvy::from_filename(&cli.env) {
        Ok(_) => true,
        Err(e) if e.not_found() => false,
        Err(e) => return Err(e.into()),
    };

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    if !env_loaded {
        log::debug!("No {} file found, using process environment", cli.env);
    }

    let config = LoaderConfig::from_env()?;
    log::debug!("{:?}", config);

    match cli.command {
        Commands::Load {
            file,
            batch_size,
            workers,
            timeout,
            strict,
            json,
        } => {
            let config = config
                .with_batch_size(batch_size)
                .with_workers(workers)
                .with_timeout_secs(timeout)
                .with_strict(strict);

            log::info!(
                "Loading {} into {}",
                file.display().bright_black(),
                config.database.cyan()
            );

            let reporter = TerminalReporter::new();
            let result = load_file(&file, &config, reporter).await;
            reporter.finish();
            let summary = result?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for line in format_summary(&summary).lines() {
                    log::info!("{}", line);
                }
            }

            if summary.has_errors() {
                log::warn!(
                    "{} of {} batch(es) failed and were not retried",
                    summary.batch_errors.red(),
                    summary.batches
                );
            }
        }
        Commands::Auth => {
            log::info!("Testing authorization");
            test_auth(&config).await?;
        }
    }

    Ok(())
}
