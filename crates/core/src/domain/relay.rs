use serde::Serialize;

use super::error::AppError;

/// リライト 1 回分のリレー状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayPhase {
    Pending,
    Streaming,
    Completed,
    Failed,
}

/// リレー状態を進めるイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEvent {
    /// ストリームが開いた
    Opened,
    /// 増分テキストを受信した
    Chunk,
    /// ストリーム終端
    Finished,
    /// エラー
    Errored,
}

impl RelayPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Streaming => "STREAMING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// 次の状態。終端状態からの遷移はすべて不正。
    pub fn on(self, event: RelayEvent) -> Result<RelayPhase, AppError> {
        match (self, event) {
            (Self::Pending, RelayEvent::Opened) => Ok(Self::Streaming),
            (Self::Pending, RelayEvent::Errored) => Ok(Self::Failed),
            (Self::Streaming, RelayEvent::Chunk) => Ok(Self::Streaming),
            (Self::Streaming, RelayEvent::Finished) => Ok(Self::Completed),
            (Self::Streaming, RelayEvent::Errored) => Ok(Self::Failed),
            (phase, event) => Err(AppError::invalid_state(format!(
                "relay event {event:?} is not allowed in {} phase",
                phase.as_str()
            ))),
        }
    }
}
