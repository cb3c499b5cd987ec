//! Lexwise CLI entry point.

use anyhow::Result;
use clap::Parser;
use lexwise::cli::{commands, Cli, Commands};
use lexwise::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging; the server falls back to general.log_level
    let log_level = match (cli.verbose, &cli.command) {
        (0, Commands::Serve { .. }) => settings.general.log_level.as_str(),
        (0, _) => "warn",
        (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lexwise={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings, config_path.as_deref())?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Ingest {
            index,
            namespace,
            server,
        } => {
            commands::run_ingest(index.clone(), namespace.clone(), server.clone(), settings).await?;
        }

        Commands::Files => {
            commands::run_files(&settings)?;
        }

        Commands::Summarize { path, output } => {
            commands::run_summarize(path, output.clone(), settings).await?;
        }

        Commands::Ask {
            question,
            summary,
            summary_file,
            show_references,
        } => {
            commands::run_ask(
                question,
                summary.clone(),
                summary_file.clone(),
                *show_references,
                settings,
            )
            .await?;
        }

        Commands::Stats { index, namespace } => {
            commands::run_stats(index.clone(), namespace.clone(), settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
