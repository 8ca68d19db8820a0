use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::domain::error::AppError;
use crate::domain::settings::AppSettings;
use crate::domain::types::{ProcessingStats, RewriteOutcome, Tone, WorkspaceSnapshot};
use crate::domain::workspace::{StateTransition, Workspace};
use crate::infra::metrics::{Metrics, MetricsSummary};
use crate::infra::normalizer::TextNormalizer;
use crate::infra::output::OutputRouter;
use crate::infra::rewriter::{relay_to_sink, RewriteContext, Rewriter};

/// リライトサービス（ワークスペース + リライター）
pub struct RewriteService {
    rewriter: Arc<dyn Rewriter>,
    workspace: Mutex<Workspace>,
    output_router: OutputRouter,
    metrics: Metrics,
    clean_before_rewrite: bool,
}

impl RewriteService {
    pub fn new(rewriter: Arc<dyn Rewriter>, settings: &AppSettings) -> Self {
        Self::with_output(rewriter, settings, OutputRouter::new())
    }

    pub fn with_output(
        rewriter: Arc<dyn Rewriter>,
        settings: &AppSettings,
        output_router: OutputRouter,
    ) -> Self {
        log::info!(
            "RewriteService 初期化: rewriter={}, output={}",
            rewriter.name(),
            output_router.target_name()
        );
        Self {
            rewriter,
            workspace: Mutex::new(Workspace::new(settings.default_tone)),
            output_router,
            metrics: Metrics::new(),
            clean_before_rewrite: settings.clean_before_rewrite,
        }
    }

    // ==================== Workspace ====================

    pub fn set_input(&self, text: impl Into<String>) -> Result<(), AppError> {
        self.workspace.lock().set_input(text)
    }

    pub fn set_tone(&self, tone: Tone) -> Result<(), AppError> {
        self.workspace.lock().set_tone(tone)
    }

    pub fn workspace(&self) -> WorkspaceSnapshot {
        let ws = self.workspace.lock();
        WorkspaceSnapshot {
            input: ws.input().to_string(),
            output: ws.output().to_string(),
            tone: ws.tone(),
            state: ws.state().clone(),
            input_words: TextNormalizer::word_count(ws.input()),
            output_words: TextNormalizer::word_count(ws.output()),
        }
    }

    /// 入力をローカルで正規化する。空入力なら何もしない。
    pub fn quick_clean(&self) -> Result<Option<StateTransition>, AppError> {
        let mut ws = self.workspace.lock();
        if ws.input().is_empty() {
            return Ok(None);
        }

        if !TextNormalizer::needs_normalization(ws.input()) {
            log::debug!("quick clean: 入力は正規化済み");
        }
        let cleaned = TextNormalizer::normalize(ws.input());
        let transition = ws.mark_cleaned(cleaned)?;
        self.metrics.inc_cleans();
        log::info!(
            "quick clean: {} -> {}",
            transition.prev_state,
            transition.new_state.as_str()
        );
        Ok(Some(transition))
    }

    /// 入力をリライトし、増分ごとに出力へ追記して `sink` に渡す
    pub async fn humanize<F>(&self, mut sink: F) -> Result<RewriteOutcome, AppError>
    where
        F: FnMut(&str),
    {
        let start = Instant::now();

        let (cleaned, tone) = {
            let mut ws = self.workspace.lock();
            if ws.input().trim().is_empty() {
                return Err(AppError::invalid_input("input text is empty"));
            }
            let cleaned = if self.clean_before_rewrite {
                TextNormalizer::normalize(ws.input())
            } else {
                ws.input().to_string()
            };
            ws.begin_processing(cleaned.clone())?;
            (cleaned, ws.tone())
        };

        let request_id = uuid::Uuid::new_v4().to_string();
        self.metrics.inc_rewrites_started();
        log::info!(
            "[{request_id}] humanize 開始: tone={tone}, {} 語",
            TextNormalizer::word_count(&cleaned)
        );

        let ctx = RewriteContext { tone };
        let relayed = relay_to_sink(self.rewriter.as_ref(), &cleaned, ctx, |chunk| {
            if let Err(e) = self.workspace.lock().append_output(chunk) {
                log::warn!("[{request_id}] 出力の追記に失敗: {e}");
            }
            sink(chunk);
        })
        .await;

        let mut ws = self.workspace.lock();
        let summary = match relayed {
            Ok(summary) => summary,
            Err(e) => {
                let err = AppError::from(e);
                ws.fail(&err)?;
                self.metrics.inc_failure(err.code);
                log::error!("[{request_id}] humanize 失敗: {err}");
                return Err(err);
            }
        };
        ws.complete()?;

        let output = ws.output().to_string();
        let stats = ProcessingStats {
            original_words: TextNormalizer::word_count(&cleaned),
            new_words: TextNormalizer::word_count(&output),
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        self.metrics.inc_rewrites_completed();
        self.metrics.add_chunks(summary.chunks);
        if let Some(ms) = summary.first_chunk_ms {
            self.metrics.record_latency("first_chunk", ms);
        }
        self.metrics
            .record_latency("rewrite", stats.processing_time_ms);

        log::info!(
            "[{request_id}] humanize 完了: {} -> {} 語, {} ms",
            stats.original_words,
            stats.new_words,
            stats.processing_time_ms
        );

        Ok(RewriteOutcome {
            request_id,
            cleaned_input: cleaned,
            output,
            chunks: summary.chunks,
            stats,
        })
    }

    /// 入力・出力を消去して Idle に戻す
    pub fn clear_all(&self) -> Result<StateTransition, AppError> {
        self.workspace.lock().clear()
    }

    // ==================== Output ====================

    pub fn copy_output(&self) -> Result<(), AppError> {
        let text = self.workspace.lock().output().to_string();
        self.output_router.deliver(&text)
    }

    pub fn copy_input(&self) -> Result<(), AppError> {
        let text = self.workspace.lock().input().to_string();
        self.output_router.deliver(&text)
    }

    // ==================== Metrics ====================

    pub fn metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures_util::stream::{self, StreamExt};
    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::workspace::AppState;
    use crate::infra::output::OutputTarget;
    use crate::infra::rewriter::testing::ScriptedRewriter;
    use crate::infra::rewriter::{RelayError, TextStream};

    #[derive(Clone, Default)]
    struct RecordingOutput {
        delivered: Arc<Mutex<Vec<String>>>,
    }

    impl OutputTarget for RecordingOutput {
        fn deliver(&self, text: &str) -> Result<(), AppError> {
            self.delivered.lock().push(text.to_string());
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn service(rewriter: ScriptedRewriter) -> (RewriteService, Arc<ScriptedRewriter>, RecordingOutput) {
        service_with(rewriter, AppSettings::default())
    }

    fn service_with(
        rewriter: ScriptedRewriter,
        settings: AppSettings,
    ) -> (RewriteService, Arc<ScriptedRewriter>, RecordingOutput) {
        let rewriter = Arc::new(rewriter);
        let output = RecordingOutput::default();
        let svc = RewriteService::with_output(
            rewriter.clone(),
            &settings,
            OutputRouter::with_target(Box::new(output.clone())),
        );
        (svc, rewriter, output)
    }

    #[test]
    fn test_quick_clean_normalizes_input() {
        let (svc, rewriter, _) = service(ScriptedRewriter::chunks(&[]));
        svc.set_input("  Hola   mundo\n\n esto\t es ").unwrap();

        let transition = svc.quick_clean().unwrap().unwrap();
        assert_eq!(transition.prev_state, "IDLE");
        assert_eq!(transition.new_state, AppState::Completed);

        let ws = svc.workspace();
        assert_eq!(ws.input, "Hola mundo esto es");
        assert_eq!(ws.input_words, 4);
        assert!(rewriter.calls.lock().is_empty());
        assert_eq!(svc.metrics().cleans, 1);
    }

    #[test]
    fn test_quick_clean_on_empty_input_is_noop() {
        let (svc, _, _) = service(ScriptedRewriter::chunks(&[]));
        assert!(svc.quick_clean().unwrap().is_none());
        assert_eq!(svc.workspace().state, AppState::Idle);
        assert_eq!(svc.metrics().cleans, 0);
    }

    #[tokio::test]
    async fn test_humanize_streams_into_output_and_sink() {
        let (svc, rewriter, _) = service(ScriptedRewriter::chunks(&["Texto ", "", "reescrito ", "aquí."]));
        svc.set_input("  texto   original\tde prueba ").unwrap();
        svc.set_tone(Tone::Formal).unwrap();

        let mut seen = Vec::new();
        let outcome = svc.humanize(|c| seen.push(c.to_string())).await.unwrap();

        assert_eq!(seen, vec!["Texto ", "reescrito ", "aquí."]);
        assert_eq!(outcome.output, "Texto reescrito aquí.");
        assert_eq!(outcome.cleaned_input, "texto original de prueba");
        assert_eq!(outcome.chunks, 3);
        assert_eq!(outcome.stats.original_words, 4);
        assert_eq!(outcome.stats.new_words, 3);

        let calls = rewriter.calls.lock();
        assert_eq!(
            calls.as_slice(),
            &[("texto original de prueba".to_string(), Tone::Formal)]
        );

        let ws = svc.workspace();
        assert_eq!(ws.state, AppState::Completed);
        assert_eq!(ws.input, "texto original de prueba");
        assert_eq!(ws.output, "Texto reescrito aquí.");
        assert_eq!(ws.output_words, 3);
    }

    #[tokio::test]
    async fn test_humanize_without_cleaning_sends_raw_input() {
        let settings = AppSettings {
            clean_before_rewrite: false,
            ..Default::default()
        };
        let (svc, rewriter, _) = service_with(ScriptedRewriter::chunks(&["ok"]), settings);
        svc.set_input("a  b\n").unwrap();

        let outcome = svc.humanize(|_| {}).await.unwrap();
        assert_eq!(outcome.cleaned_input, "a  b\n");
        assert_eq!(rewriter.calls.lock()[0].0, "a  b\n");
    }

    #[tokio::test]
    async fn test_humanize_rejects_empty_input() {
        let (svc, rewriter, _) = service(ScriptedRewriter::chunks(&["nunca"]));
        svc.set_input(" \n\t ").unwrap();

        let err = svc.humanize(|_| {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(svc.workspace().state, AppState::Idle);
        assert!(rewriter.calls.lock().is_empty());
        assert_eq!(svc.metrics().rewrites_started, 0);
    }

    #[tokio::test]
    async fn test_humanize_failure_keeps_partial_output() {
        let (svc, _, _) = service(ScriptedRewriter::new(vec![
            Ok("Parcial ".into()),
            Err(RelayError::Transport("connection reset".into())),
        ]));
        svc.set_input("algo de texto").unwrap();

        let mut seen = Vec::new();
        let err = svc.humanize(|c| seen.push(c.to_string())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Transport);
        assert_eq!(seen, vec!["Parcial "]);

        let ws = svc.workspace();
        assert_eq!(ws.output, "Parcial ");
        match ws.state {
            AppState::Error { code, .. } => assert_eq!(code, "E_TRANSPORT"),
            other => panic!("unexpected state: {other:?}"),
        }

        let m = svc.metrics();
        assert_eq!(m.rewrites_failed, 1);
        assert_eq!(m.error_counts.transport, 1);
    }

    #[tokio::test]
    async fn test_humanize_open_failure_reports_config_error() {
        let (svc, _, _) = service(ScriptedRewriter::failing_open(RelayError::Configuration(
            "API key is not set".into(),
        )));
        svc.set_input("hola").unwrap();

        let err = svc.humanize(|_| panic!("sink must not be called")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Config);
        assert!(!err.recoverable);
        assert!(svc.workspace().output.is_empty());
        assert_eq!(svc.metrics().error_counts.config, 1);
    }

    /// チャネルから増分を受け取るまで止まるリライター
    struct GatedRewriter {
        rx: Mutex<Option<mpsc::UnboundedReceiver<Result<String, RelayError>>>>,
    }

    #[async_trait]
    impl Rewriter for GatedRewriter {
        async fn rewrite_stream(
            &self,
            _text: &str,
            _ctx: RewriteContext,
        ) -> Result<TextStream, RelayError> {
            let rx = self
                .rx
                .lock()
                .take()
                .ok_or_else(|| RelayError::Internal("already streaming".into()))?;
            Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_second_humanize_while_processing_is_rejected() {
        let (tx, rx) = mpsc::unbounded_channel();
        let svc = RewriteService::with_output(
            Arc::new(GatedRewriter {
                rx: Mutex::new(Some(rx)),
            }),
            &AppSettings::default(),
            OutputRouter::with_target(Box::new(RecordingOutput::default())),
        );
        svc.set_input("primer texto").unwrap();
        tx.send(Ok("parcial".into())).unwrap();

        let mut first = Box::pin(svc.humanize(|_| {}));
        assert!(futures_util::poll!(first.as_mut()).is_pending());
        assert_eq!(svc.workspace().state, AppState::Processing);
        assert_eq!(svc.workspace().output, "parcial");

        let err = svc.humanize(|_| panic!("sink must not be called")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert_eq!(svc.set_input("otro").unwrap_err().code, ErrorCode::InvalidState);
        assert_eq!(svc.workspace().state, AppState::Processing);

        drop(tx);
        let outcome = first.await.unwrap();
        assert_eq!(outcome.output, "parcial");
        assert_eq!(svc.workspace().state, AppState::Completed);
        assert_eq!(svc.metrics().rewrites_started, 1);
    }

    #[tokio::test]
    async fn test_new_request_clears_previous_output() {
        let (svc, _, _) = service(ScriptedRewriter::chunks(&["primera"]));
        svc.set_input("uno").unwrap();
        svc.humanize(|_| {}).await.unwrap();
        assert_eq!(svc.workspace().output, "primera");

        // 2 回目は台本が尽きて失敗するが、前回の出力は残らない
        let err = svc.humanize(|_| {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(svc.workspace().output.is_empty());
    }

    #[tokio::test]
    async fn test_metrics_after_success() {
        let (svc, _, _) = service(ScriptedRewriter::chunks(&["a", "b"]));
        svc.set_input("x").unwrap();
        svc.humanize(|_| {}).await.unwrap();

        let m = svc.metrics();
        assert_eq!(m.rewrites_started, 1);
        assert_eq!(m.rewrites_completed, 1);
        assert_eq!(m.chunks_relayed, 2);
        assert!(m.avg_latency_ms.first_chunk.is_some());
        assert!(m.avg_latency_ms.rewrite.is_some());
    }

    #[tokio::test]
    async fn test_clear_all_resets_workspace() {
        let (svc, _, _) = service(ScriptedRewriter::chunks(&["salida"]));
        svc.set_input("entrada").unwrap();
        svc.humanize(|_| {}).await.unwrap();

        let transition = svc.clear_all().unwrap();
        assert_eq!(transition.prev_state, "COMPLETED");
        let ws = svc.workspace();
        assert_eq!(ws.state, AppState::Idle);
        assert!(ws.input.is_empty());
        assert!(ws.output.is_empty());
    }

    #[tokio::test]
    async fn test_copy_output_and_input() {
        let (svc, _, output) = service(ScriptedRewriter::chunks(&["Resultado final"]));

        let err = svc.copy_output().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        svc.set_input("entrada").unwrap();
        svc.humanize(|_| {}).await.unwrap();
        svc.copy_output().unwrap();
        svc.copy_input().unwrap();

        assert_eq!(
            output.delivered.lock().as_slice(),
            &["Resultado final".to_string(), "entrada".to_string()]
        );
    }

    #[test]
    fn test_default_tone_from_settings() {
        let settings = AppSettings {
            default_tone: Tone::Formal,
            ..Default::default()
        };
        let (svc, _, _) = service_with(ScriptedRewriter::chunks(&[]), settings);
        assert_eq!(svc.workspace().tone, Tone::Formal);
    }
}
