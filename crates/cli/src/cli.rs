use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use hz_core::domain::types::Tone;

/// コマンドライン定義
#[derive(Debug, Parser)]
#[command(
    name = "humanizer",
    version,
    about = "Rewrite text in an academic or formal register, streamed from Gemini"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Settings file (default: <config_dir>/humanizer/settings.toml).
    #[arg(global = true, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Collapse whitespace runs and trim the text. No network access.
    Clean(CleanArgs),
    /// Stream a rewrite of the text to stdout.
    Rewrite(RewriteArgs),
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Input file; `-` or omitted reads stdin.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RewriteArgs {
    /// Input file; `-` or omitted reads stdin.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// Target tone: academic or formal (default from settings).
    #[arg(long, short = 't')]
    pub tone: Option<Tone>,
    /// Send the text as-is, without whitespace normalization.
    #[arg(long)]
    pub no_clean: bool,
    /// Copy the finished rewrite to the clipboard.
    #[arg(long)]
    pub copy: bool,
    /// Echo the input through a local rewriter instead of calling the service.
    #[arg(long)]
    pub dry_run: bool,
}
