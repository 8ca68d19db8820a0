use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_CONFIG")]
    Config,
    #[serde(rename = "E_INVALID_INPUT")]
    InvalidInput,
    #[serde(rename = "E_INVALID_STATE")]
    InvalidState,
    #[serde(rename = "E_TRANSPORT")]
    Transport,
    #[serde(rename = "E_SERVICE")]
    Service,
    #[serde(rename = "E_TIMEOUT")]
    Timeout,
    #[serde(rename = "E_INTERNAL")]
    Internal,
    #[serde(rename = "E_SETTINGS")]
    Settings,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "E_CONFIG",
            Self::InvalidInput => "E_INVALID_INPUT",
            Self::InvalidState => "E_INVALID_STATE",
            Self::Transport => "E_TRANSPORT",
            Self::Service => "E_SERVICE",
            Self::Timeout => "E_TIMEOUT",
            Self::Internal => "E_INTERNAL",
            Self::Settings => "E_SETTINGS",
        }
    }
}

/// アプリケーションエラー
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    pub fn new(code: ErrorCode, msg: impl Into<String>, recoverable: bool) -> Self {
        Self {
            code,
            message: msg.into(),
            recoverable,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Config, msg, false)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg, true)
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, msg, true)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg, false)
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Settings, msg, false)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}
