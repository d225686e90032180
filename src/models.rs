use regex::Regex;
use serde::{Deserialize, Serialize};

/// `GET /api/config/db`. The backend answers `{}` when nothing is configured.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DbConfigPayload {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

impl DbConfigPayload {
    pub fn has_host(&self) -> bool {
        self.host
            .as_deref()
            .map(|host| !host.trim().is_empty())
            .unwrap_or(false)
    }
}

/// `GET /api/databases`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabasesPayload {
    #[serde(default)]
    pub databases: Option<DatabaseListing>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DatabasesPayload {
    pub fn into_names(self) -> Vec<String> {
        self.databases
            .map(DatabaseListing::into_names)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DatabaseListing {
    Names(Vec<String>),
    /// Older backends returned the raw tool output, e.g. `[('shop',), ('hr',)]`.
    Legacy(String),
}

impl DatabaseListing {
    pub fn into_names(self) -> Vec<String> {
        match self {
            Self::Names(names) => names,
            Self::Legacy(raw) => parse_legacy_listing(&raw),
        }
    }
}

/// Extracts every single-quoted name from a legacy listing, in order.
pub fn parse_legacy_listing(raw: &str) -> Vec<String> {
    let Ok(quoted) = Regex::new(r"'([^']*)'") else {
        return Vec::new();
    };
    quoted
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// `GET /api/config/llm`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LlmConfigPayload {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub has_openrouter_key: bool,
    #[serde(default)]
    pub key_length: usize,
}

/// `GET /api/llm/models?provider=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsPayload {
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /api/config/llm`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub api_key: String,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub provider: String,
    pub model: String,
    pub api_key: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, settings: &LlmSettings) -> Self {
        Self {
            message: message.into(),
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
}
