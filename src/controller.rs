//! Sequences state transitions, backend requests and rendering for each UI
//! operation.
//!
//! State lives in a `RefCell` that is never held across an await, so a
//! front end may start a second operation while the first one is waiting on
//! the network. The chat in-flight guard is set before the first await.

use std::cell::RefCell;

use tracing::{debug, error, warn};

use crate::api::{ApiClient, Transport};
use crate::models::{ChatRequest, LlmSettings};
use crate::state::{ConnectionConfig, DbConfigForm, UiState};

pub const DB_SAVE_FAILED: &str = "Failed to save config.";
pub const LLM_SAVE_FAILED: &str = "Failed to save LLM settings.";
pub const LLM_SAVED: &str = "LLM Settings Saved!";

/// The rendering side of the UI.
pub trait View {
    /// Brings the presentation in line with `state`. Called after every
    /// transition, so implementations should skip unchanged parts.
    fn render(&self, state: &UiState);

    /// Blocking, user-visible notice.
    fn alert(&self, message: &str);
}

pub struct Controller<T, V> {
    api: ApiClient<T>,
    view: V,
    state: RefCell<UiState>,
}

impl<T: Transport, V: View> Controller<T, V> {
    pub fn new(api: ApiClient<T>, view: V) -> Self {
        let config = api.config();
        let state = UiState::new(config.key_provider.clone(), &config.default_provider);
        Self {
            api,
            view,
            state: RefCell::new(state),
        }
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn with_state<R>(&self, read: impl FnOnce(&UiState) -> R) -> R {
        read(&self.state.borrow())
    }

    /// The LLM form as the controller last wrote it.
    pub fn llm_settings(&self) -> LlmSettings {
        self.with_state(|state| state.llm.settings())
    }

    fn update<R>(&self, apply: impl FnOnce(&mut UiState) -> R) -> R {
        let out = apply(&mut self.state.borrow_mut());
        self.view.render(&self.state.borrow());
        out
    }

    /// Page-load sequence. Each step finishes before the next starts, so the
    /// database listing always sees the configuration loaded just before it.
    pub async fn load(&self) {
        self.update(|_| ());
        self.load_db_config().await;
        self.refresh_databases().await;
        self.load_llm_config().await;
    }

    async fn load_db_config(&self) {
        match self.api.database_config().await {
            Ok(payload) => {
                let applied = self.update(|state| state.apply_db_config(&payload));
                debug!(applied, "loaded database config");
            }
            Err(err) => warn!("could not load initial database config: {err}"),
        }
    }

    pub async fn refresh_databases(&self) {
        match self.api.databases().await {
            Ok(payload) => {
                if let Some(reason) = payload.error.as_deref() {
                    warn!("backend could not list databases: {reason}");
                }
                let names = payload.into_names();
                let alerts = self.update(|state| state.apply_database_list(names));
                for alert in alerts {
                    self.view.alert(&alert);
                }
            }
            Err(err) => {
                error!("error loading databases: {err}");
                self.update(UiState::mark_disconnected);
            }
        }
    }

    /// Submits the database form. The modal stays open unless the backend
    /// accepted the configuration.
    pub async fn save_db_config(&self, form: &DbConfigForm) -> bool {
        let current = self.with_state(|state| state.db.connection.clone());
        let config = match form.to_config(&current) {
            Ok(config) => config,
            Err(err) => {
                self.view.alert(&err.to_string());
                return false;
            }
        };

        if !self.post_connection(&config).await {
            return false;
        }
        self.update(|state| state.db_config_saved(config));
        self.refresh_databases().await;
        true
    }

    pub async fn switch_database(&self, database: &str) -> bool {
        let config = self.with_state(|state| state.db.connection.with_database(database));
        if !self.post_connection(&config).await {
            return false;
        }
        self.update(|state| state.database_switched(config));
        true
    }

    async fn post_connection(&self, config: &ConnectionConfig) -> bool {
        match self.api.save_database_config(config).await {
            Ok(()) => true,
            Err(err) if err.is_status() => {
                warn!("backend rejected database config: {err}");
                self.view.alert(DB_SAVE_FAILED);
                false
            }
            Err(err) => {
                error!("error saving database config: {err}");
                self.view.alert(&format!("Error saving config: {err}"));
                false
            }
        }
    }

    async fn load_llm_config(&self) {
        match self.api.llm_config().await {
            Ok(payload) => {
                let provider = self.update(|state| state.apply_llm_provider(&payload));
                self.refresh_models(&provider).await;
                self.update(|state| state.apply_llm_model(&payload));
            }
            Err(err) => warn!("could not load LLM config: {err}"),
        }
    }

    pub async fn change_provider(&self, provider: &str) {
        self.update(|state| state.select_provider(provider));
        self.refresh_models(provider).await;
    }

    pub async fn refresh_models(&self, provider: &str) {
        self.update(UiState::models_loading);
        match self.api.models(provider).await {
            Ok(payload) => {
                if let Some(reason) = self.update(|state| state.models_loaded(payload)) {
                    error!(provider, "no models listed: {reason}");
                }
            }
            Err(err) => {
                error!(provider, "error fetching models: {err}");
                self.update(UiState::models_failed);
            }
        }
    }

    pub fn set_model(&self, model: &str) {
        self.update(|state| state.set_model(model));
    }

    /// Returns `false` when the current provider takes no key.
    pub fn set_api_key(&self, key: &str) -> bool {
        self.update(|state| state.set_api_key(key))
    }

    pub async fn save_llm_config(&self, settings: LlmSettings) -> bool {
        match self.api.save_llm_config(&settings).await {
            Ok(()) => {
                self.view.alert(LLM_SAVED);
                self.refresh_models(&settings.provider).await;
                self.update(|state| state.restore_model(&settings.model));
                true
            }
            Err(err) if err.is_status() => {
                warn!("backend rejected LLM settings: {err}");
                self.view.alert(LLM_SAVE_FAILED);
                false
            }
            Err(err) => {
                error!("error saving LLM settings: {err}");
                self.view
                    .alert(&format!("Error saving LLM settings: {err}"));
                false
            }
        }
    }

    /// Sends one chat message. Returns `false` without touching the
    /// transcript when the input is blank or another message is in flight.
    pub async fn send_chat(&self, input: &str, settings: LlmSettings) -> bool {
        let Some(message) = self.state.borrow_mut().begin_chat(input) else {
            debug!("chat submission ignored");
            return false;
        };
        self.view.render(&self.state.borrow());

        let request = ChatRequest::new(message, &settings);
        let outcome = match self.api.chat(&request).await {
            Ok(reply) => Ok(reply.response),
            Err(err) => {
                error!("chat request failed: {err}");
                Err(err.to_string())
            }
        };
        self.update(|state| state.finish_chat(outcome));
        true
    }

    pub fn open_db_modal(&self) {
        self.update(UiState::open_db_modal);
    }

    pub fn close_db_modal(&self) {
        self.update(UiState::close_db_modal);
    }

    pub fn collapse_sidebar(&self) {
        self.update(UiState::collapse_sidebar);
    }

    pub fn expand_sidebar(&self) {
        self.update(UiState::expand_sidebar);
    }
}
