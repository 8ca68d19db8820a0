use super::OutputTarget;
use crate::domain::error::AppError;

/// クリップボード出力
pub struct ClipboardOutput;

impl ClipboardOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClipboardOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputTarget for ClipboardOutput {
    fn deliver(&self, text: &str) -> Result<(), AppError> {
        let mut ctx = arboard::Clipboard::new()
            .map_err(|e| AppError::internal(format!("clipboard init failed: {e}")))?;
        ctx.set_text(text)
            .map_err(|e| AppError::internal(format!("clipboard write failed: {e}")))?;
        log::info!("クリップボードに出力: {} 文字", text.chars().count());
        Ok(())
    }

    fn name(&self) -> &str {
        "clipboard"
    }
}
