use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// リライトのトーン
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tone {
    #[default]
    Academic,
    Formal,
}

impl Tone {
    pub const ALL: [Tone; 2] = [Tone::Academic, Tone::Formal];

    /// システムインストラクションに埋め込むトーンの説明ラベル
    pub fn label(&self) -> &'static str {
        match self {
            Self::Academic => "Académico Riguroso (Nivel Tesis Doctoral)",
            Self::Formal => "Formal Profesional (Nivel Corporativo/Ejecutivo)",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Academic => "ACADEMIC",
            Self::Formal => "FORMAL",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tone: {0} (expected academic or formal)")]
pub struct ParseToneError(pub String);

impl FromStr for Tone {
    type Err = ParseToneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "academic" => Ok(Self::Academic),
            "formal" => Ok(Self::Formal),
            _ => Err(ParseToneError(s.to_string())),
        }
    }
}

/// 生成パラメータ（固定値）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl GenerationParams {
    pub const TEMPERATURE: f32 = 1.0;
    pub const TOP_P: f32 = 0.95;
    pub const TOP_K: u32 = 64;
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: Self::TEMPERATURE,
            top_p: Self::TOP_P,
            top_k: Self::TOP_K,
        }
    }
}

/// リライトリクエスト（呼び出しごとに生成、永続化しない）
#[derive(Debug, Clone)]
pub struct RewriteRequest {
    pub text: String,
    pub tone: Tone,
    pub params: GenerationParams,
}

impl RewriteRequest {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
            params: GenerationParams::default(),
        }
    }
}

/// 処理統計
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub original_words: usize,
    pub new_words: usize,
    pub processing_time_ms: u64,
}

/// ワークスペースのスナップショット
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSnapshot {
    pub input: String,
    pub output: String,
    pub tone: Tone,
    pub state: super::workspace::AppState,
    pub input_words: usize,
    pub output_words: usize,
}

/// humanize の結果
#[derive(Debug, Clone, Serialize)]
pub struct RewriteOutcome {
    pub request_id: String,
    pub cleaned_input: String,
    pub output: String,
    pub chunks: usize,
    pub stats: ProcessingStats,
}
