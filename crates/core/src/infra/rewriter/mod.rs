pub mod gemini;
mod noop;
pub mod prompts;

pub use gemini::GeminiRewriter;
pub use noop::NoopRewriter;

use std::time::Instant;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use serde::Serialize;

use crate::domain::error::{AppError, ErrorCode};
use crate::domain::relay::{RelayEvent, RelayPhase};
use crate::domain::types::Tone;

/// リレーエラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RelayError {
    #[error("Relay not configured: {0}")]
    Configuration(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Transport failed: {0}")]
    Transport(String),
    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },
    #[error("Prompt blocked by service: {0}")]
    Blocked(String),
    #[error("Malformed stream: {0}")]
    MalformedStream(String),
    #[error("Relay timeout")]
    Timeout,
    #[error("Internal relay error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::Config,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::Transport(_) | Self::MalformedStream(_) => ErrorCode::Transport,
            Self::Service { .. } | Self::Blocked(_) => ErrorCode::Service,
            Self::Timeout => ErrorCode::Timeout,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// 同じリクエストを後で再実行して成功しうるか
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::Internal(_) => false,
            Self::Service { status, .. } => *status == 429 || *status >= 500,
            _ => true,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        AppError::new(e.code(), e.to_string(), e.is_recoverable())
    }
}

/// 増分テキストのストリーム。遅延・有限・再生不可。
/// 最初のエラーを返した後は何も返さない。
pub type TextStream = BoxStream<'static, Result<String, RelayError>>;

/// リライトコンテキスト
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext {
    pub tone: Tone,
}

/// リライター trait（外部 LLM やテスト用フェイクが実装する）
#[async_trait]
pub trait Rewriter: Send + Sync {
    /// リクエストを発行し、増分テキストのストリームを返す
    async fn rewrite_stream(
        &self,
        text: &str,
        ctx: RewriteContext,
    ) -> Result<TextStream, RelayError>;

    fn name(&self) -> &str;
}

/// 中継結果のサマリー
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelaySummary {
    pub chunks: usize,
    pub chars: usize,
    pub first_chunk_ms: Option<u64>,
    pub elapsed_ms: u64,
}

/// ストリームを消費し、空でない増分を到着順にそのままシンクへ渡す。
/// エラーは 1 回だけ返し、以降シンクは呼ばれない。リトライはしない。
pub async fn relay_to_sink<F>(
    rewriter: &dyn Rewriter,
    text: &str,
    ctx: RewriteContext,
    mut sink: F,
) -> Result<RelaySummary, RelayError>
where
    F: FnMut(&str),
{
    let started = Instant::now();
    let phase = RelayPhase::Pending;

    let mut stream = match rewriter.rewrite_stream(text, ctx).await {
        Ok(stream) => stream,
        Err(e) => {
            advance(phase, RelayEvent::Errored)?;
            log::error!("[{}] rewrite request failed: {e}", rewriter.name());
            return Err(e);
        }
    };
    let mut phase = advance(phase, RelayEvent::Opened)?;
    let mut summary = RelaySummary::default();

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) if chunk.is_empty() => {}
            Ok(chunk) => {
                phase = advance(phase, RelayEvent::Chunk)?;
                if summary.first_chunk_ms.is_none() {
                    summary.first_chunk_ms = Some(started.elapsed().as_millis() as u64);
                }
                summary.chunks += 1;
                summary.chars += chunk.chars().count();
                log::debug!("[{}] chunk #{} ({} bytes)", rewriter.name(), summary.chunks, chunk.len());
                sink(&chunk);
            }
            Err(e) => {
                advance(phase, RelayEvent::Errored)?;
                log::error!(
                    "[{}] stream failed after {} chunks: {e}",
                    rewriter.name(),
                    summary.chunks
                );
                return Err(e);
            }
        }
    }

    advance(phase, RelayEvent::Finished)?;
    summary.elapsed_ms = started.elapsed().as_millis() as u64;
    log::info!(
        "[{}] stream completed: {} chunks, {} chars in {} ms",
        rewriter.name(),
        summary.chunks,
        summary.chars,
        summary.elapsed_ms
    );
    Ok(summary)
}

fn advance(phase: RelayPhase, event: RelayEvent) -> Result<RelayPhase, RelayError> {
    let next = phase
        .on(event)
        .map_err(|e| RelayError::Internal(e.message))?;
    if next.is_terminal() {
        log::debug!("relay phase {} -> {} (terminal)", phase.as_str(), next.as_str());
    } else if next != phase {
        log::debug!("relay phase {} -> {}", phase.as_str(), next.as_str());
    }
    Ok(next)
}

#[cfg(test)]
pub(crate) mod testing {
    use futures_util::stream;
    use parking_lot::Mutex;

    use super::*;

    /// 台本どおりの増分/エラーを返すフェイク
    pub struct ScriptedRewriter {
        open_error: Option<RelayError>,
        script: Mutex<Option<Vec<Result<String, RelayError>>>>,
        pub calls: Mutex<Vec<(String, Tone)>>,
    }

    impl ScriptedRewriter {
        pub fn new(script: Vec<Result<String, RelayError>>) -> Self {
            Self {
                open_error: None,
                script: Mutex::new(Some(script)),
                calls: Mutex::new(vec![]),
            }
        }

        pub fn chunks(parts: &[&str]) -> Self {
            Self::new(parts.iter().map(|p| Ok(p.to_string())).collect())
        }

        pub fn failing_open(err: RelayError) -> Self {
            Self {
                open_error: Some(err),
                script: Mutex::new(None),
                calls: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Rewriter for ScriptedRewriter {
        async fn rewrite_stream(
            &self,
            text: &str,
            ctx: RewriteContext,
        ) -> Result<TextStream, RelayError> {
            self.calls.lock().push((text.to_string(), ctx.tone));
            if let Some(e) = &self.open_error {
                return Err(e.clone());
            }
            let script = self
                .script
                .lock()
                .take()
                .ok_or_else(|| RelayError::Internal("script already consumed".into()))?;
            Ok(stream::iter(script).boxed())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
