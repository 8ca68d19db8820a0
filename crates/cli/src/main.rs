mod cli;
mod commands;

use std::process;

use clap::Parser;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use hz_core::infra::settings_store::load_settings;

use crate::cli::{Cli, Commands};
use crate::commands::CliError;

/// 失敗時に表示する共通メッセージ
const FAILURE_NOTICE: &str = "Hubo un error al procesar el texto. Por favor intenta de nuevo.";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        log::error!("{err}");
        eprintln!("{FAILURE_NOTICE}");
        if let Some(hint) = err.hint() {
            eprintln!("{hint}");
        }
        process::exit(1);
    }
}

/// stderr へ出力。RUST_LOG があればそちらを優先。
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if let Err(e) = result {
        eprintln!("logger init skipped: {e}");
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Clean(args) => commands::clean(args, &settings),
        Commands::Rewrite(args) => commands::rewrite(args, &settings).await,
    }
}
