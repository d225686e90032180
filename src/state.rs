//! Pure UI state and its transitions.
//!
//! Nothing in here performs I/O. The controller feeds backend results into
//! these methods and hands the resulting [`UiState`] to a view for rendering,
//! which keeps every rule below testable without a browser.

use serde::Serialize;

use crate::error::FormError;
use crate::models::{DbConfigPayload, LlmConfigPayload, LlmSettings, ModelsPayload};

pub const DATABASE_ERROR_PREFIX: &str = "Error:";
pub const DATABASE_PLACEHOLDER: &str = "Select Database";
pub const THINKING_PLACEHOLDER: &str = "Thinking...";
pub const CHAT_ERROR_PREFIX: &str = "Sorry, I encountered an error: ";

pub const MODELS_LOADING: &str = "Loading models...";
pub const MODELS_READY: &str = "Type to search or select...";
pub const MODELS_EMPTY: &str = "No models found";
pub const MODELS_FAILED: &str = "Error loading models";

const KEY_MASK: &str = "•";

/// Connection settings for the backend's MySQL session.
///
/// Updates never mutate in place; [`ConnectionConfig::merged`] and
/// [`ConnectionConfig::with_database`] return the next value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Empty when no default database is chosen.
    pub database: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: String::new(),
        }
    }
}

impl ConnectionConfig {
    pub fn merged(&self, patch: &DbConfigPayload) -> Self {
        Self {
            host: patch.host.clone().unwrap_or_else(|| self.host.clone()),
            port: patch.port.unwrap_or(self.port),
            user: patch.user.clone().unwrap_or_else(|| self.user.clone()),
            password: patch
                .password
                .clone()
                .unwrap_or_else(|| self.password.clone()),
            database: patch
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone()),
        }
    }

    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..self.clone()
        }
    }
}

/// Raw values of the database form, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbConfigForm {
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DbConfigForm {
    /// Builds the configuration to submit. An empty database field keeps the
    /// database already in use.
    pub fn to_config(&self, current: &ConnectionConfig) -> Result<ConnectionConfig, FormError> {
        let port = self
            .port
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|port| *port > 0)
            .ok_or_else(|| FormError::InvalidPort(self.port.clone()))?;

        let database = if self.database.is_empty() {
            current.database.clone()
        } else {
            self.database.clone()
        };

        Ok(ConnectionConfig {
            host: self.host.clone(),
            port,
            user: self.user.clone(),
            password: self.password.clone(),
            database,
        })
    }
}

/// A form field value written by the controller.
///
/// Every write bumps the revision, so a renderer can overwrite the control
/// only when the controller actually wrote to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValue {
    value: String,
    revision: u64,
}

impl FieldValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            revision: 0,
        }
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.set(String::new());
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbFormFields {
    pub host: FieldValue,
    pub port: FieldValue,
    pub user: FieldValue,
    pub password: FieldValue,
    pub database: FieldValue,
}

impl DbFormFields {
    fn fill(&mut self, config: &ConnectionConfig) {
        self.host.set(config.host.clone());
        self.port.set(config.port.to_string());
        self.user.set(config.user.clone());
        self.password.set(config.password.clone());
        self.database.set(config.database.clone());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Connected => "status-dot connected",
            Self::Disconnected => "status-dot disconnected",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseSelect {
    pub options: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbPanel {
    pub connection: ConnectionConfig,
    pub form: DbFormFields,
    /// Derived from the last database-list fetch only.
    pub status: ConnectionStatus,
    pub select: DatabaseSelect,
    pub modal_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmFormState {
    pub provider: FieldValue,
    pub model: FieldValue,
    pub api_key: FieldValue,
    pub api_key_visible: bool,
    pub api_key_placeholder: String,
    pub models: Vec<String>,
    pub model_placeholder: String,
}

impl LlmFormState {
    fn new(default_provider: &str) -> Self {
        Self {
            provider: FieldValue::new(default_provider),
            model: FieldValue::default(),
            api_key: FieldValue::default(),
            api_key_visible: false,
            api_key_placeholder: String::new(),
            models: Vec::new(),
            model_placeholder: MODELS_READY.to_string(),
        }
    }

    /// Current field values as a submission.
    pub fn settings(&self) -> LlmSettings {
        LlmSettings {
            provider: self.provider.value().to_string(),
            model: self.model.value().to_string(),
            api_key: self.api_key.value().to_string(),
        }
    }
}

pub type MessageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Ai,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatPhase {
    #[default]
    Idle,
    /// A request is in flight; `placeholder` is the "Thinking..." bubble.
    Sending { placeholder: MessageId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    pub phase: ChatPhase,
    /// Bumped whenever the message input must be emptied.
    pub input_clears: u64,
    next_id: MessageId,
}

impl ChatState {
    pub fn is_sending(&self) -> bool {
        matches!(self.phase, ChatPhase::Sending { .. })
    }

    fn push(&mut self, role: Role, content: impl Into<String>) -> MessageId {
        self.next_id += 1;
        let id = self.next_id;
        self.messages.push(ChatMessage {
            id,
            role,
            content: content.into(),
        });
        id
    }

    fn remove(&mut self, id: MessageId) {
        self.messages.retain(|message| message.id != id);
    }
}

/// Everything the controller owns. One value per page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub db: DbPanel,
    pub llm: LlmFormState,
    pub chat: ChatState,
    pub sidebar_collapsed: bool,
    key_provider: String,
}

impl UiState {
    /// `key_provider` is the one provider whose API key the user may enter.
    pub fn new(key_provider: impl Into<String>, default_provider: &str) -> Self {
        Self {
            db: DbPanel::default(),
            llm: LlmFormState::new(default_provider),
            chat: ChatState::default(),
            sidebar_collapsed: false,
            key_provider: key_provider.into(),
        }
    }

    pub fn key_provider(&self) -> &str {
        &self.key_provider
    }

    /// Applies the stored backend configuration. Ignored unless it names a host.
    pub fn apply_db_config(&mut self, payload: &DbConfigPayload) -> bool {
        if !payload.has_host() {
            return false;
        }
        self.db.connection = self.db.connection.merged(payload);
        self.db.form.fill(&self.db.connection);
        true
    }

    /// Replaces the database options with a fresh listing and returns one
    /// alert per entry the backend flagged as an error.
    ///
    /// The connection counts as established only when at least one usable
    /// database came back.
    pub fn apply_database_list(&mut self, names: Vec<String>) -> Vec<String> {
        let mut alerts = Vec::new();
        let mut options = Vec::new();
        for name in names {
            if name.starts_with(DATABASE_ERROR_PREFIX) {
                alerts.push(format!("Database Error: {name}"));
            } else {
                options.push(name);
            }
        }

        let current = &self.db.connection.database;
        self.db.select.selected = options.iter().find(|name| *name == current).cloned();
        self.db.status = if options.is_empty() {
            ConnectionStatus::Disconnected
        } else {
            ConnectionStatus::Connected
        };
        self.db.select.options = options;
        alerts
    }

    pub fn mark_disconnected(&mut self) {
        self.db.status = ConnectionStatus::Disconnected;
    }

    pub fn open_db_modal(&mut self) {
        self.db.modal_open = true;
    }

    pub fn close_db_modal(&mut self) {
        self.db.modal_open = false;
    }

    pub fn db_config_saved(&mut self, config: ConnectionConfig) {
        self.db.connection = config;
        self.db.modal_open = false;
    }

    pub fn database_switched(&mut self, config: ConnectionConfig) {
        self.db.select.selected = Some(config.database.clone());
        self.db.connection = config;
    }

    /// Sets the provider and shows the API-key field only for the
    /// key-requiring provider. Hiding the field also clears it.
    pub fn select_provider(&mut self, provider: &str) {
        self.llm.provider.set(provider);
        if provider == self.key_provider {
            self.llm.api_key_visible = true;
        } else {
            self.llm.api_key_visible = false;
            self.llm.api_key.clear();
        }
    }

    /// First half of applying `GET /api/config/llm`: the provider. Returns
    /// the provider whose models should be listed next.
    pub fn apply_llm_provider(&mut self, payload: &LlmConfigPayload) -> String {
        let provider = match payload.provider.as_deref() {
            Some(provider) if !provider.is_empty() => provider.to_string(),
            _ => self.llm.provider.value().to_string(),
        };
        self.select_provider(&provider);
        provider
    }

    /// Second half, applied once the model list is in: model and key mask.
    pub fn apply_llm_model(&mut self, payload: &LlmConfigPayload) {
        if let Some(model) = payload.model.as_deref().filter(|model| !model.is_empty()) {
            self.llm.model.set(model);
        }
        if payload.has_openrouter_key {
            self.llm.api_key_placeholder = masked_key(payload.key_length);
        }
    }

    pub fn models_loading(&mut self) {
        self.llm.models.clear();
        self.llm.model_placeholder = MODELS_LOADING.to_string();
    }

    /// Returns the server-supplied error, if the listing came back empty with one.
    pub fn models_loaded(&mut self, payload: ModelsPayload) -> Option<String> {
        if payload.models.is_empty() {
            self.llm.models.clear();
            self.llm.model_placeholder = MODELS_EMPTY.to_string();
            return payload.error;
        }
        self.llm.models = payload.models;
        self.llm.model_placeholder = MODELS_READY.to_string();
        None
    }

    pub fn models_failed(&mut self) {
        self.llm.models.clear();
        self.llm.model_placeholder = MODELS_FAILED.to_string();
    }

    pub fn restore_model(&mut self, model: &str) {
        if !model.is_empty() {
            self.llm.model.set(model);
        }
    }

    /// Model typed directly into the form. Empty clears it.
    pub fn set_model(&mut self, model: &str) {
        self.llm.model.set(model);
    }

    /// API key typed into the form. Ignored while the key field is hidden.
    pub fn set_api_key(&mut self, key: &str) -> bool {
        if !self.llm.api_key_visible {
            return false;
        }
        self.llm.api_key.set(key);
        true
    }

    /// Starts a chat exchange. Returns the message to send, or `None` when the
    /// input is blank or another exchange is still in flight.
    pub fn begin_chat(&mut self, input: &str) -> Option<String> {
        let message = input.trim();
        if message.is_empty() || self.chat.is_sending() {
            return None;
        }

        self.chat.push(Role::User, message);
        self.chat.input_clears += 1;
        let placeholder = self.chat.push(Role::Ai, THINKING_PLACEHOLDER);
        self.chat.phase = ChatPhase::Sending { placeholder };
        Some(message.to_string())
    }

    /// Resolves the in-flight exchange. Always returns the chat to idle.
    pub fn finish_chat(&mut self, outcome: Result<String, String>) {
        if let ChatPhase::Sending { placeholder } = self.chat.phase {
            self.chat.remove(placeholder);
        }
        match outcome {
            Ok(response) => {
                self.chat.push(Role::Ai, response);
            }
            Err(reason) => {
                self.chat
                    .push(Role::Ai, format!("{CHAT_ERROR_PREFIX}{reason}"));
            }
        }
        self.chat.phase = ChatPhase::Idle;
    }

    pub fn collapse_sidebar(&mut self) {
        self.sidebar_collapsed = true;
    }

    pub fn expand_sidebar(&mut self) {
        self.sidebar_collapsed = false;
    }
}

fn masked_key(length: usize) -> String {
    KEY_MASK.repeat(length)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> UiState {
        UiState::new("openrouter", "local")
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn connection_defaults_to_local_root() {
        let config = ConnectionConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3306);
        assert_eq!(config.user, "root");
        assert!(config.password.is_empty());
        assert!(config.database.is_empty());
    }

    #[test]
    fn merge_keeps_fields_the_patch_omits() {
        let base = ConnectionConfig::default().with_database("shop");
        let merged = base.merged(&DbConfigPayload {
            host: Some("db.internal".to_string()),
            port: Some(3307),
            ..Default::default()
        });
        assert_eq!(merged.host, "db.internal");
        assert_eq!(merged.port, 3307);
        assert_eq!(merged.user, "root");
        assert_eq!(merged.database, "shop");
        assert_eq!(base.host, "127.0.0.1");
    }

    #[test]
    fn db_config_without_host_is_ignored() {
        let mut ui = state();
        let before = ui.clone();
        assert!(!ui.apply_db_config(&DbConfigPayload::default()));
        assert_eq!(ui, before);
    }

    #[test]
    fn db_config_with_host_fills_form() {
        let mut ui = state();
        assert!(ui.apply_db_config(&DbConfigPayload {
            host: Some("10.0.0.5".to_string()),
            port: Some(3308),
            user: Some("app".to_string()),
            password: Some("secret".to_string()),
            database: Some("sales".to_string()),
        }));
        assert_eq!(ui.db.connection.database, "sales");
        assert_eq!(ui.db.form.host.value(), "10.0.0.5");
        assert_eq!(ui.db.form.port.value(), "3308");
        assert_eq!(ui.db.form.password.value(), "secret");
        assert_eq!(ui.db.form.database.revision(), 1);
    }

    #[test]
    fn form_keeps_existing_database_when_left_blank() {
        let current = ConnectionConfig::default().with_database("shop");
        let form = DbConfigForm {
            host: "db".to_string(),
            port: " 3310".to_string(),
            user: "u".to_string(),
            password: "p".to_string(),
            database: String::new(),
        };
        let config = form.to_config(&current).unwrap();
        assert_eq!(config.port, 3310);
        assert_eq!(config.database, "shop");
    }

    #[test]
    fn form_rejects_unparseable_port() {
        let current = ConnectionConfig::default();
        for port in ["", "abc", "0", "70000"] {
            let form = DbConfigForm {
                port: port.to_string(),
                ..Default::default()
            };
            assert_eq!(
                form.to_config(&current),
                Err(FormError::InvalidPort(port.to_string()))
            );
        }
    }

    #[test]
    fn database_list_keeps_valid_entries_in_order() {
        let mut ui = state();
        ui.db.connection = ui.db.connection.with_database("hr");
        let alerts = ui.apply_database_list(names(&["shop", "Error: denied", "hr", "logs"]));

        assert_eq!(alerts, vec!["Database Error: Error: denied"]);
        assert_eq!(ui.db.select.options, names(&["shop", "hr", "logs"]));
        assert_eq!(ui.db.select.selected.as_deref(), Some("hr"));
        assert!(ui.db.status.is_connected());
    }

    #[test]
    fn all_error_listing_is_never_connected() {
        let mut ui = state();
        let alerts =
            ui.apply_database_list(names(&["Error: access denied", "Error: unknown host"]));
        assert_eq!(alerts.len(), 2);
        assert!(ui.db.select.options.is_empty());
        assert_eq!(ui.db.status, ConnectionStatus::Disconnected);

        let alerts = ui.apply_database_list(Vec::new());
        assert!(alerts.is_empty());
        assert_eq!(ui.db.status, ConnectionStatus::Disconnected);
    }

    #[test]
    fn unknown_current_database_selects_nothing() {
        let mut ui = state();
        ui.db.connection = ui.db.connection.with_database("gone");
        ui.apply_database_list(names(&["shop"]));
        assert_eq!(ui.db.select.selected, None);
    }

    #[test]
    fn provider_toggles_api_key_field() {
        let mut ui = state();
        ui.select_provider("openrouter");
        assert!(ui.llm.api_key_visible);

        ui.llm.api_key.set("sk-typed");
        ui.select_provider("local");
        assert!(!ui.llm.api_key_visible);
        assert_eq!(ui.llm.api_key.value(), "");

        ui.select_provider("google");
        assert!(!ui.llm.api_key_visible);
    }

    #[test]
    fn llm_config_masks_existing_key() {
        let mut ui = state();
        let payload = LlmConfigPayload {
            provider: Some("openrouter".to_string()),
            model: Some("openai/gpt-4o".to_string()),
            has_openrouter_key: true,
            key_length: 5,
        };
        assert_eq!(ui.apply_llm_provider(&payload), "openrouter");
        ui.apply_llm_model(&payload);
        assert!(ui.llm.api_key_visible);
        assert_eq!(ui.llm.model.value(), "openai/gpt-4o");
        assert_eq!(ui.llm.api_key_placeholder, "•••••");
    }

    #[test]
    fn llm_config_without_provider_keeps_default() {
        let mut ui = state();
        assert_eq!(ui.apply_llm_provider(&LlmConfigPayload::default()), "local");
        assert!(!ui.llm.api_key_visible);
    }

    #[test]
    fn model_listing_placeholders() {
        let mut ui = state();
        ui.models_loading();
        assert_eq!(ui.llm.model_placeholder, MODELS_LOADING);

        let err = ui.models_loaded(ModelsPayload {
            models: Vec::new(),
            error: Some("OpenRouter API Key not found in environment.".to_string()),
        });
        assert_eq!(ui.llm.model_placeholder, MODELS_EMPTY);
        assert!(err.is_some());

        let err = ui.models_loaded(ModelsPayload {
            models: names(&["llama3.2:latest"]),
            error: None,
        });
        assert_eq!(err, None);
        assert_eq!(ui.llm.models, names(&["llama3.2:latest"]));
        assert_eq!(ui.llm.model_placeholder, MODELS_READY);

        ui.models_failed();
        assert!(ui.llm.models.is_empty());
        assert_eq!(ui.llm.model_placeholder, MODELS_FAILED);
    }

    #[test]
    fn chat_guard_blocks_second_submission() {
        let mut ui = state();
        assert_eq!(ui.begin_chat("  hello \n").as_deref(), Some("hello"));
        let len = ui.chat.messages.len();
        assert_eq!(len, 2);

        assert_eq!(ui.begin_chat("again"), None);
        assert_eq!(ui.chat.messages.len(), len);
    }

    #[test]
    fn blank_chat_input_is_ignored() {
        let mut ui = state();
        assert_eq!(ui.begin_chat("   "), None);
        assert!(ui.chat.messages.is_empty());
        assert_eq!(ui.chat.input_clears, 0);
    }

    #[test]
    fn finishing_chat_replaces_placeholder() {
        let mut ui = state();
        ui.begin_chat("hello");
        ui.finish_chat(Ok("hi".to_string()));

        let rendered: Vec<_> = ui
            .chat
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(rendered, vec![(Role::User, "hello"), (Role::Ai, "hi")]);
        assert_eq!(ui.chat.phase, ChatPhase::Idle);
    }

    #[test]
    fn failed_chat_reports_reason_and_goes_idle() {
        let mut ui = state();
        ui.begin_chat("hello");
        ui.finish_chat(Err("API Error (HTTP 500)".to_string()));
        let last = ui.chat.messages.last().unwrap();
        assert_eq!(
            last.content,
            "Sorry, I encountered an error: API Error (HTTP 500)"
        );
        assert!(
            !ui.chat
                .messages
                .iter()
                .any(|m| m.content == THINKING_PLACEHOLDER)
        );
        assert!(!ui.chat.is_sending());
    }

    #[test]
    fn sidebar_and_modal_toggle() {
        let mut ui = state();
        ui.collapse_sidebar();
        assert!(ui.sidebar_collapsed);
        ui.expand_sidebar();
        assert!(!ui.sidebar_collapsed);

        ui.open_db_modal();
        assert!(ui.db.modal_open);
        ui.db_config_saved(ConnectionConfig::default().with_database("x"));
        assert!(!ui.db.modal_open);
        assert_eq!(ui.db.connection.database, "x");
    }

    #[test]
    fn typed_key_only_lands_while_field_is_shown() {
        let mut ui = state();
        assert!(!ui.set_api_key("sk-ignored"));
        assert_eq!(ui.llm.api_key.value(), "");

        ui.select_provider("openrouter");
        assert!(ui.set_api_key("sk-live"));
        ui.set_model("openai/gpt-4o");
        assert_eq!(ui.llm.settings().api_key, "sk-live");
        assert_eq!(ui.llm.settings().model, "openai/gpt-4o");

        ui.set_model("");
        assert_eq!(ui.llm.model.value(), "");
    }
}
