use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::Tone;

pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LANGUAGE: &str = "Español Latinoamericano Neutro";

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Gemini API キー（未設定なら degraded モード）
    pub api_key: Option<String>,
    /// モデル ID
    pub model: String,
    /// API ベース URL
    pub api_base_url: String,
    /// 出力言語の指示
    pub language: String,
    /// デフォルトトーン
    pub default_tone: Tone,
    /// 接続タイムアウト（秒）
    pub connect_timeout_secs: u64,
    /// リクエスト全体のタイムアウト（秒、0=無制限）
    pub request_timeout_secs: u64,
    /// リライト前に空白を正規化するか
    pub clean_before_rewrite: bool,
}

impl AppSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// 空白だけのキーは未設定として扱う
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// ログ出力用（API キーをマスク）
    pub fn redacted(&self) -> Self {
        Self {
            api_key: self.credential().map(|_| "***".to_string()),
            ..self.clone()
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            default_tone: Tone::Academic,
            connect_timeout_secs: 10,
            request_timeout_secs: 300,
            clean_before_rewrite: true,
        }
    }
}
