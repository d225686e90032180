use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
struct FileConfig {
    backend_url: Option<String>,
    request_timeout_seconds: Option<u64>,
    chat_timeout_seconds: Option<u64>,
    key_provider: Option<String>,
    default_provider: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RootConfig {
    #[serde(default, flatten)]
    top: FileConfig,
    ui: Option<FileConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix for every `/api/...` path. Empty means same origin.
    pub backend_url: String,
    pub request_timeout_seconds: u64,
    pub chat_timeout_seconds: u64,
    /// The provider whose API key can be entered in the UI.
    pub key_provider: String,
    pub default_provider: String,
    pub config_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_seconds: 30,
            chat_timeout_seconds: 300,
            key_provider: "openrouter".to_string(),
            default_provider: "local".to_string(),
            config_path: PathBuf::from("sqlagent-ui.toml"),
        }
    }
}

impl ClientConfig {
    /// Settings for the page served by the backend itself.
    pub fn same_origin() -> Self {
        Self {
            backend_url: String::new(),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();

        let config_path = find_config_file().unwrap_or_else(|| config_search_paths()[0].clone());
        cfg.config_path = config_path.clone();

        let RootConfig { top, ui } = load_root_config(&config_path)?;
        cfg.apply_file(top);
        if let Some(section) = ui {
            cfg.apply_file(section);
        }

        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_file(&mut self, file_cfg: FileConfig) {
        set_opt(&mut self.backend_url, file_cfg.backend_url);
        set_opt_u64_min(
            &mut self.request_timeout_seconds,
            file_cfg.request_timeout_seconds,
            1,
        );
        set_opt_u64_min(
            &mut self.chat_timeout_seconds,
            file_cfg.chat_timeout_seconds,
            5,
        );
        set_opt(&mut self.key_provider, file_cfg.key_provider);
        set_opt(&mut self.default_provider, file_cfg.default_provider);
    }

    fn apply_env(&mut self) {
        let env_cfg = FileConfig {
            backend_url: env_string("SQLAGENT_UI_BACKEND_URL"),
            request_timeout_seconds: env_parse("SQLAGENT_UI_REQUEST_TIMEOUT_SECONDS"),
            chat_timeout_seconds: env_parse("SQLAGENT_UI_CHAT_TIMEOUT_SECONDS"),
            key_provider: env_string("SQLAGENT_UI_KEY_PROVIDER"),
            default_provider: env_string("SQLAGENT_UI_DEFAULT_PROVIDER"),
        };
        self.apply_file(env_cfg);
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_seconds)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.backend_url.trim_end_matches('/'), path)
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("sqlagent-ui.toml"),
        PathBuf::from("config.toml"),
    ];
    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("sqlagent-ui").join("config.toml"));
    }
    paths
}

pub fn find_config_file() -> Option<PathBuf> {
    config_search_paths().into_iter().find(|path| path.exists())
}

fn dirs_home() -> Option<PathBuf> {
    env::var("HOME").ok().map(PathBuf::from)
}

fn load_root_config(path: &Path) -> Result<RootConfig> {
    if !path.exists() {
        return Ok(RootConfig::default());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {path:?}"))?;
    parse_root_config(&raw).with_context(|| format!("failed parsing {path:?}"))
}

fn parse_root_config(raw: &str) -> Result<RootConfig> {
    toml::from_str::<RootConfig>(raw).context("failed parsing config as root structure")
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_parse<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn set_opt<T>(dst: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *dst = v;
    }
}

fn set_opt_u64_min(dst: &mut u64, value: Option<u64>, min: u64) {
    if let Some(v) = value {
        *dst = v.max(min);
    }
}
