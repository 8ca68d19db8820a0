use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::future;
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::prompts;
use super::{RelayError, RewriteContext, Rewriter, TextStream};
use crate::domain::settings::AppSettings;
use crate::domain::types::{GenerationParams, RewriteRequest};

/// Gemini streamGenerateContent (SSE) を使用したリライター
pub struct GeminiRewriter {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    language: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    generation_config: GenerationParams,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<u16>,
    message: String,
}

impl GeminiRewriter {
    /// API キーがなくても構築できる（degraded モード: 全リクエストが即失敗）
    pub fn new(settings: &AppSettings) -> Result<Self, RelayError> {
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout());
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RelayError::Configuration(format!("HTTP client build failed: {e}")))?;

        let api_key = settings.credential().map(str::to_string);
        if api_key.is_none() {
            log::warn!("Gemini API key is missing; rewrite requests will fail until one is configured");
        }

        Ok(Self {
            client,
            api_key,
            model: settings.model.clone(),
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            language: settings.language.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn build_request(&self, req: &RewriteRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: req.text.clone(),
                }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: prompts::system_instruction(req.tone, &self.language),
                }],
            },
            generation_config: req.params,
        }
    }
}

#[async_trait]
impl Rewriter for GeminiRewriter {
    async fn rewrite_stream(
        &self,
        text: &str,
        ctx: RewriteContext,
    ) -> Result<TextStream, RelayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RelayError::Configuration("Gemini API key is not configured".to_string()))?;

        if text.trim().is_empty() {
            return Err(RelayError::InvalidInput("text is empty".to_string()));
        }

        let req = RewriteRequest::new(text, ctx.tone);
        let request = self.build_request(&req);
        log::info!(
            "Gemini rewrite: model={} tone={} chars={}",
            self.model,
            req.tone,
            req.text.chars().count()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(status, &body));
        }

        Ok(decode_event_stream(response.bytes_stream()))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn service_error(status: u16, body: &str) -> RelayError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    RelayError::Service { status, message }
}

/// 1 イベント分の JSON から増分テキストを取り出す（thought パートは除外）
fn chunk_text(payload: &str) -> Result<Option<String>, RelayError> {
    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| RelayError::MalformedStream(format!("invalid event JSON: {e}")))?;

    if let Some(err) = chunk.error {
        return Err(RelayError::Service {
            status: err.code.unwrap_or(500),
            message: err.message,
        });
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(Some(text));
    }
    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(RelayError::Blocked(reason));
    }
    Ok(None)
}

/// バイト列を UTF-8 の文字境界でそろえて流す。
/// 不正なバイト列があれば、その手前までを先に流してからエラーを 1 つ返す。
fn utf8_chunks<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, RelayError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: Into<RelayError> + Send,
{
    bytes
        .map(Some)
        .chain(stream::once(future::ready(None)))
        .scan(Vec::<u8>::new(), |carry, item| {
            let out = match item {
                Some(Ok(chunk)) => {
                    carry.extend_from_slice(chunk.as_ref());
                    take_utf8(carry)
                }
                Some(Err(e)) => vec![Err(e.into())],
                None if carry.is_empty() => vec![],
                None => vec![Err(RelayError::MalformedStream(
                    "truncated UTF-8 sequence at end of stream".to_string(),
                ))],
            };
            future::ready(Some(out))
        })
        .flat_map(stream::iter)
}

fn take_utf8(carry: &mut Vec<u8>) -> Vec<Result<String, RelayError>> {
    let err = match std::str::from_utf8(carry) {
        Ok(text) => {
            let text = text.to_string();
            carry.clear();
            return vec![Ok(text)];
        }
        Err(e) => e,
    };

    let valid = err.valid_up_to();
    let mut out = Vec::new();
    if valid > 0 {
        out.push(Ok(String::from_utf8_lossy(&carry[..valid]).into_owned()));
    }
    match err.error_len() {
        // 末尾の文字が次のチャンクに続く
        None => {
            carry.drain(..valid);
        }
        Some(_) => {
            carry.clear();
            out.push(Err(RelayError::MalformedStream(
                "invalid UTF-8 in event stream".to_string(),
            )));
        }
    }
    out
}

fn stream_error(e: EventStreamError<RelayError>) -> RelayError {
    match e {
        EventStreamError::Transport(e) => e,
        other => RelayError::MalformedStream(other.to_string()),
    }
}

/// SSE バイトストリームを増分テキストのストリームに変換する。
/// エラー前に確定した増分はすべて先に返し、エラーは 1 回だけ返して終了する。
pub fn decode_event_stream<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<RelayError> + Send + 'static,
{
    let events = Box::pin(utf8_chunks(bytes).eventsource());

    stream::unfold(Some(events), |state| async move {
        let mut events = state?;
        loop {
            let event = match events.next().await? {
                Ok(event) => event,
                Err(e) => return Some((Err(stream_error(e)), None)),
            };
            if event.data.is_empty() {
                continue;
            }
            if event.data.trim() == "[DONE]" {
                return None;
            }
            match chunk_text(&event.data) {
                Ok(Some(text)) => return Some((Ok(text), Some(events))),
                Ok(None) => {}
                Err(e) => return Some((Err(e), None)),
            }
        }
    })
    .boxed()
}
