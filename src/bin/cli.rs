//! gradewatch CLI
//!
//! Local execution entry point for the grade polling loop.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gradewatch::{
    error::Result,
    models::Config,
    notify::{ALIVENESS_SUBJECT, TelegramNotifier},
    pipeline::{self, PollContext},
    services::SessionManager,
    storage::{CookieFile, RecordStore},
};

/// gradewatch - student-records grade poller
#[derive(Parser, Debug)]
#[command(
    name = "gradewatch",
    version,
    about = "Polls the student-records portal for new grades"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "gradewatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the polling loop until interrupted
    Run {
        /// Keep the existing record store instead of re-initializing it
        #[arg(long)]
        keep_state: bool,
    },

    /// Run a single poll cycle and exit
    Once {
        /// Epoch to run the cycle at (0 triggers initialization behavior)
        #[arg(long, default_value_t = 0)]
        epoch: u64,
    },

    /// Validate configuration and environment
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Assemble the poll context from configuration.
async fn build_context(config: &Config) -> Result<PollContext> {
    let notifier = TelegramNotifier::from_config(&config.notify)?;
    let session = SessionManager::new(
        &config.http,
        config.portal.clone(),
        config.credentials.clone(),
        CookieFile::new(&config.storage.cookies_path),
    )?;
    let store = RecordStore::open(&config.storage.records_path).await?;

    Ok(PollContext {
        source: Box::new(session),
        store,
        notifier: Box::new(notifier),
    })
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("gradewatch starting...");

    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Run { keep_state } => {
            config.validate()?;
            let mut ctx = build_context(&config).await?;

            if keep_state {
                log::info!(
                    "Keeping {} existing record(s); skipping re-initialization",
                    ctx.store.len()
                );
            } else {
                ctx.store.drop_all().await?;
                log::info!("Record store cleared for a fresh initialization epoch");
            }

            ctx.notifier
                .send(
                    ALIVENESS_SUBJECT,
                    "gradewatch started successfully and will begin polling.",
                )
                .await?;

            pipeline::run_loop(&mut ctx, &config.poll).await
        }

        Command::Once { epoch } => {
            config.validate()?;
            let mut ctx = build_context(&config).await?;

            pipeline::run_cycle(&mut ctx, epoch).await?;
            log::info!("Cycle complete. Store now holds {} record(s)", ctx.store.len());
            Ok(())
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            match config.credentials.resolve() {
                Ok(_) => log::info!("✓ Credentials resolvable from the environment"),
                Err(e) => {
                    log::error!("Credential check failed: {}", e);
                    return Err(e);
                }
            }

            match TelegramNotifier::from_config(&config.notify) {
                Ok(_) => log::info!("✓ Notifier token present"),
                Err(e) => {
                    log::error!("Notifier check failed: {}", e);
                    return Err(e);
                }
            }

            log::info!("All validations passed!");
            Ok(())
        }
    }
}
