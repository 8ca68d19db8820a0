use serde::Serialize;

use super::error::AppError;
use super::types::Tone;

/// ワークスペース状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    Idle,
    Processing,
    Completed,
    Error { code: String, message: String },
}

impl AppState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "IDLE",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Error { .. } => "ERROR",
        }
    }
}

/// 状態遷移
#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    pub prev_state: String,
    pub new_state: AppState,
}

/// ワークスペース（入力・出力・トーン・状態、単一リクエスト）
#[derive(Debug, Clone)]
pub struct Workspace {
    input: String,
    output: String,
    tone: Tone,
    state: AppState,
}

impl Workspace {
    pub fn new(tone: Tone) -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            tone,
            state: AppState::Idle,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn is_processing(&self) -> bool {
        self.state == AppState::Processing
    }

    pub fn set_input(&mut self, text: impl Into<String>) -> Result<(), AppError> {
        self.ensure_not_processing("set_input")?;
        self.input = text.into();
        Ok(())
    }

    /// トーンはリクエスト中は変更不可
    pub fn set_tone(&mut self, tone: Tone) -> Result<(), AppError> {
        self.ensure_not_processing("set_tone")?;
        self.tone = tone;
        Ok(())
    }

    /// クイッククリーン: 入力を正規化済みテキストに置き換え → Completed
    pub fn mark_cleaned(&mut self, cleaned: String) -> Result<StateTransition, AppError> {
        self.ensure_not_processing("mark_cleaned")?;
        self.input = cleaned;
        Ok(self.transition(AppState::Completed))
    }

    /// リライト開始: 入力を置き換え、前回の出力をクリア → Processing
    pub fn begin_processing(&mut self, cleaned: String) -> Result<StateTransition, AppError> {
        self.ensure_not_processing("begin_processing")?;
        self.input = cleaned;
        self.output.clear();
        Ok(self.transition(AppState::Processing))
    }

    pub fn append_output(&mut self, chunk: &str) -> Result<(), AppError> {
        if !self.is_processing() {
            return Err(AppError::invalid_state(format!(
                "append_output is not allowed in {} state",
                self.state.as_str()
            )));
        }
        self.output.push_str(chunk);
        Ok(())
    }

    /// Processing → Completed
    pub fn complete(&mut self) -> Result<StateTransition, AppError> {
        self.ensure_processing("complete")?;
        Ok(self.transition(AppState::Completed))
    }

    /// Processing → Error（途中までの出力は保持）
    pub fn fail(&mut self, err: &AppError) -> Result<StateTransition, AppError> {
        self.ensure_processing("fail")?;
        Ok(self.transition(AppState::Error {
            code: err.code.as_str().to_string(),
            message: err.message.clone(),
        }))
    }

    /// 入力・出力を消去 → Idle
    pub fn clear(&mut self) -> Result<StateTransition, AppError> {
        self.ensure_not_processing("clear")?;
        self.input.clear();
        self.output.clear();
        Ok(self.transition(AppState::Idle))
    }

    fn transition(&mut self, next: AppState) -> StateTransition {
        let prev = self.state.as_str().to_string();
        self.state = next;
        StateTransition {
            prev_state: prev,
            new_state: self.state.clone(),
        }
    }

    fn ensure_processing(&self, op: &str) -> Result<(), AppError> {
        if self.is_processing() {
            Ok(())
        } else {
            Err(AppError::invalid_state(format!(
                "{op} is not allowed in {} state",
                self.state.as_str()
            )))
        }
    }

    fn ensure_not_processing(&self, op: &str) -> Result<(), AppError> {
        if self.is_processing() {
            Err(AppError::invalid_state(format!(
                "{op} is not allowed while a rewrite is in progress"
            )))
        } else {
            Ok(())
        }
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(Tone::default())
    }
}
