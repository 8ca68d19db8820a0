use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use super::{RelayError, RewriteContext, Rewriter, TextStream};

/// NoopRewriter: ネットワークを使わず、入力を単語ごとの増分としてそのまま返す。
/// `--dry-run` と認証情報なしの動作確認用。
pub struct NoopRewriter;

#[async_trait]
impl Rewriter for NoopRewriter {
    async fn rewrite_stream(
        &self,
        text: &str,
        _ctx: RewriteContext,
    ) -> Result<TextStream, RelayError> {
        if text.trim().is_empty() {
            return Err(RelayError::InvalidInput("text is empty".to_string()));
        }

        let chunks: Vec<Result<String, RelayError>> = text
            .split_inclusive(char::is_whitespace)
            .map(|word| Ok(word.to_string()))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Tone;

    #[tokio::test]
    async fn test_noop_rewriter_echoes_in_word_chunks() {
        let ctx = RewriteContext {
            tone: Tone::Academic,
        };
        let chunks: Vec<String> = NoopRewriter
            .rewrite_stream("Hola mundo esto", ctx)
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;
        assert_eq!(chunks, vec!["Hola ", "mundo ", "esto"]);
        assert_eq!(chunks.concat(), "Hola mundo esto");
    }

    #[tokio::test]
    async fn test_noop_rejects_empty() {
        let ctx = RewriteContext { tone: Tone::Formal };
        assert!(NoopRewriter.rewrite_stream("", ctx).await.is_err());
    }

    #[test]
    fn test_noop_name() {
        assert_eq!(NoopRewriter.name(), "noop");
    }
}
