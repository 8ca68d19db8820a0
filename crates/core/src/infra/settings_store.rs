use std::path::{Path, PathBuf};

use crate::domain::error::AppError;
use crate::domain::settings::AppSettings;

/// API キーの環境変数（先頭ほど優先）
pub const ENV_API_KEYS: [&str; 3] = ["HUMANIZER_API_KEY", "GEMINI_API_KEY", "API_KEY"];
pub const ENV_MODEL: &str = "HUMANIZER_MODEL";
pub const ENV_BASE_URL: &str = "HUMANIZER_BASE_URL";

/// TOML 設定ファイル（読み取り専用）
pub struct SettingsStore {
    path: PathBuf,
    required: bool,
}

impl SettingsStore {
    /// 明示指定されたファイル。存在しなければエラー。
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }

    /// `<config_dir>/humanizer/settings.toml`。存在しなければデフォルト設定。
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self {
            path: dir.join("humanizer").join("settings.toml"),
            required: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<AppSettings, AppError> {
        if !self.path.exists() {
            if self.required {
                return Err(AppError::settings(format!(
                    "settings file not found: {}",
                    self.path.display()
                )));
            }
            log::debug!("設定ファイルなし、デフォルトを使用: {}", self.path.display());
            return Ok(AppSettings::default());
        }

        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            AppError::settings(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let settings = toml::from_str::<AppSettings>(&raw).map_err(|e| {
            AppError::settings(format!("invalid settings in {}: {e}", self.path.display()))
        })?;

        log::info!("設定を読み込みました: {}", self.path.display());
        Ok(settings)
    }
}

/// 環境変数で上書きする。空白だけの値は無視。
pub fn apply_env_overrides<F>(settings: &mut AppSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(key) = ENV_API_KEYS.iter().find_map(|name| get(*name)) {
        settings.api_key = Some(key);
    }
    if let Some(model) = get(ENV_MODEL) {
        settings.model = model;
    }
    if let Some(url) = get(ENV_BASE_URL) {
        settings.api_base_url = url;
    }
}

/// 設定の解決: デフォルト < ファイル < 環境変数
pub fn load_settings(explicit: Option<&Path>) -> Result<AppSettings, AppError> {
    let store = match explicit {
        Some(path) => Some(SettingsStore::explicit(path)),
        None => SettingsStore::default_location(),
    };

    let mut settings = match store {
        Some(store) => store.load()?,
        None => AppSettings::default(),
    };
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());

    log::debug!("effective settings: {:?}", settings.redacted());
    Ok(settings)
}
