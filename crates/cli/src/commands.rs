use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use hz_core::domain::error::{AppError, ErrorCode};
use hz_core::domain::settings::AppSettings;
use hz_core::infra::rewriter::{GeminiRewriter, NoopRewriter, Rewriter};
use hz_core::usecase::rewrite_service::RewriteService;

use crate::cli::{CleanArgs, RewriteArgs};

/// コマンドエラー型
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    App(#[from] AppError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// 設定不備のときだけ案内を返す
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::App(e) if e.code == ErrorCode::Config => Some(
                "Set HUMANIZER_API_KEY (or GEMINI_API_KEY), or add api_key to settings.toml.",
            ),
            _ => None,
        }
    }
}

type CmdResult<T> = Result<T, CliError>;

/// ファイルまたは標準入力から読み込む（`-` は標準入力）
pub fn read_input(path: Option<&Path>) -> CmdResult<String> {
    match path {
        Some(p) if p != Path::new("-") => Ok(std::fs::read_to_string(p)?),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

pub fn clean(args: CleanArgs, settings: &AppSettings) -> CmdResult<()> {
    let text = read_input(args.input.as_deref())?;

    let service = RewriteService::new(Arc::new(NoopRewriter), settings);
    service.set_input(text)?;
    service.quick_clean()?;

    let ws = service.workspace();
    log::info!("clean: {} 語", ws.input_words);

    let mut out = io::stdout();
    writeln!(out, "{}", ws.input)?;
    Ok(())
}

pub async fn rewrite(args: RewriteArgs, settings: &AppSettings) -> CmdResult<()> {
    let text = read_input(args.input.as_deref())?;

    let mut settings = settings.clone();
    if args.no_clean {
        settings.clean_before_rewrite = false;
    }

    let rewriter: Arc<dyn Rewriter> = if args.dry_run {
        log::info!("dry run: ローカルのエコーリライターを使用");
        Arc::new(NoopRewriter)
    } else {
        Arc::new(GeminiRewriter::new(&settings).map_err(AppError::from)?)
    };

    let service = RewriteService::new(rewriter, &settings);
    service.set_input(text)?;
    service.set_tone(args.tone.unwrap_or(settings.default_tone))?;

    let mut out = io::stdout();
    let mut write_error: Option<io::Error> = None;
    let outcome = service
        .humanize(|chunk| {
            if write_error.is_some() {
                return;
            }
            if let Err(e) = out.write_all(chunk.as_bytes()).and_then(|_| out.flush()) {
                write_error = Some(e);
            }
        })
        .await?;

    if let Some(e) = write_error {
        return Err(e.into());
    }
    writeln!(out)?;

    if args.copy {
        service.copy_output()?;
        eprintln!("Copied to clipboard.");
    }

    let stats = outcome.stats;
    eprintln!(
        "{} -> {} words in {} ms ({} chunks)",
        stats.original_words, stats.new_words, stats.processing_time_ms, outcome.chunks
    );
    log::debug!(
        "metrics: {}",
        serde_json::to_string(&service.metrics()).unwrap_or_default()
    );
    Ok(())
}
