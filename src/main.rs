//! Phrase Recorder CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phrase_recorder::cli::{
    app::{load_merged_config, run_check, run_convert, run_items, run_record, EXIT_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use phrase_recorder::domain::config::AppConfig;
use phrase_recorder::infrastructure::XdgConfigStore;

/// Default log filter for a `-v` count
fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "phrase_recorder=warn",
        1 => "phrase_recorder=info",
        _ => "phrase_recorder=debug",
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for paths and URLs
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(cli.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let presenter = Presenter::new();

    let command = match cli.command {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        command => command,
    };

    let cli_config = match &command {
        Commands::Record(args) => args.config_overrides(),
        Commands::Convert(args) => args.config_overrides(),
        _ => AppConfig::empty(),
    };

    let config = match load_merged_config(cli_config).await {
        Ok(config) => config,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match command {
        Commands::Record(args) => run_record(args, config).await,
        Commands::Convert(args) => run_convert(args, config).await,
        Commands::Items => run_items(&config),
        Commands::Check => run_check(&config).await,
        Commands::Config { .. } => ExitCode::SUCCESS,
    }
}
