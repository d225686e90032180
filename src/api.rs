//! Typed access to the backend's REST endpoints.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{
    ChatReply, ChatRequest, DatabasesPayload, DbConfigPayload, LlmConfigPayload, LlmSettings,
    ModelsPayload,
};
use crate::state::ConnectionConfig;

pub const DATABASES_PATH: &str = "/api/databases";
pub const DB_CONFIG_PATH: &str = "/api/config/db";
pub const LLM_CONFIG_PATH: &str = "/api/config/llm";
pub const MODELS_PATH: &str = "/api/llm/models";
pub const CHAT_PATH: &str = "/api/chat";

/// Moves request and response bodies over HTTP.
///
/// Implementations resolve with the response body on a 2xx status, with
/// [`ApiError::Status`] otherwise, and with [`ApiError::Timeout`] once
/// `timeout` has elapsed.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<String, ApiError>;

    async fn post_json(
        &self,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<String, ApiError>;
}

pub struct ApiClient<T> {
    transport: T,
    config: ClientConfig,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn database_config(&self) -> Result<DbConfigPayload, ApiError> {
        self.get_json(DB_CONFIG_PATH).await
    }

    pub async fn save_database_config(&self, config: &ConnectionConfig) -> Result<(), ApiError> {
        self.post(DB_CONFIG_PATH, config, self.config.request_timeout())
            .await
            .map(drop)
    }

    pub async fn databases(&self) -> Result<DatabasesPayload, ApiError> {
        self.get_json(DATABASES_PATH).await
    }

    pub async fn llm_config(&self) -> Result<LlmConfigPayload, ApiError> {
        self.get_json(LLM_CONFIG_PATH).await
    }

    pub async fn save_llm_config(&self, settings: &LlmSettings) -> Result<(), ApiError> {
        self.post(LLM_CONFIG_PATH, settings, self.config.request_timeout())
            .await
            .map(drop)
    }

    pub async fn models(&self, provider: &str) -> Result<ModelsPayload, ApiError> {
        let path = format!("{MODELS_PATH}?provider={}", urlencoding::encode(provider));
        self.get_json(&path).await
    }

    /// Chat replies can take minutes, so this uses the separate chat deadline.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let body = self
            .post(CHAT_PATH, request, self.config.chat_timeout())
            .await?;
        serde_json::from_str(&body).map_err(ApiError::decode)
    }

    async fn get_json<R>(&self, path: &str) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        debug!(%url, "GET");
        let body = self
            .transport
            .get(&url, self.config.request_timeout())
            .await?;
        serde_json::from_str(&body).map_err(ApiError::decode)
    }

    async fn post<B>(&self, path: &str, body: &B, timeout: Duration) -> Result<String, ApiError>
    where
        B: Serialize,
    {
        let url = self.config.endpoint(path);
        let encoded = serde_json::to_string(body).map_err(|err| ApiError::Encode {
            message: err.to_string(),
        })?;
        debug!(%url, "POST");
        self.transport.post_json(&url, encoded, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(String, Option<String>, Duration)>>,
        reply: RefCell<Option<Result<String, ApiError>>>,
    }

    impl Recorder {
        fn replying(reply: Result<&str, ApiError>) -> Self {
            Self {
                calls: RefCell::default(),
                reply: RefCell::new(Some(reply.map(str::to_string))),
            }
        }

        fn next(&self) -> Result<String, ApiError> {
            self.reply
                .borrow_mut()
                .take()
                .unwrap_or_else(|| Err(ApiError::transport("no reply scripted")))
        }
    }

    impl Transport for Recorder {
        async fn get(&self, url: &str, timeout: Duration) -> Result<String, ApiError> {
            self.calls
                .borrow_mut()
                .push((url.to_string(), None, timeout));
            self.next()
        }

        async fn post_json(
            &self,
            url: &str,
            body: String,
            timeout: Duration,
        ) -> Result<String, ApiError> {
            self.calls
                .borrow_mut()
                .push((url.to_string(), Some(body), timeout));
            self.next()
        }
    }

    fn client(transport: Recorder) -> ApiClient<Recorder> {
        let mut config = ClientConfig::default();
        config.backend_url = "http://backend:8000".to_string();
        ApiClient::new(transport, config)
    }

    #[test]
    fn provider_is_query_encoded() {
        let api = client(Recorder::replying(Ok(r#"{"models": ["a"]}"#)));
        let payload = block_on(api.models("open router&x")).unwrap();
        assert_eq!(payload.models, vec!["a"]);

        let calls = api.transport().calls.borrow();
        assert_eq!(
            calls[0].0,
            "http://backend:8000/api/llm/models?provider=open%20router%26x"
        );
    }

    #[test]
    fn chat_uses_chat_deadline() {
        let api = client(Recorder::replying(Ok(r#"{"response": "hi"}"#)));
        let settings = LlmSettings {
            provider: "local".to_string(),
            model: "llama3.2:latest".to_string(),
            api_key: String::new(),
        };
        let reply = block_on(api.chat(&ChatRequest::new("hello", &settings))).unwrap();
        assert_eq!(reply.response, "hi");

        let calls = api.transport().calls.borrow();
        let (url, body, timeout) = &calls[0];
        assert_eq!(url, "http://backend:8000/api/chat");
        assert_eq!(*timeout, Duration::from_secs(300));
        let body: serde_json::Value = serde_json::from_str(body.as_deref().unwrap()).unwrap();
        assert_eq!(body["message"], "hello");
        assert_eq!(body["api_key"], "");
    }

    #[test]
    fn save_posts_full_connection() {
        let api = client(Recorder::replying(Ok(r#"{"status": "success"}"#)));
        let config = ConnectionConfig::default().with_database("shop");
        block_on(api.save_database_config(&config)).unwrap();

        let calls = api.transport().calls.borrow();
        let body: serde_json::Value = serde_json::from_str(calls[0].1.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "host": "127.0.0.1",
                "port": 3306,
                "user": "root",
                "password": "",
                "database": "shop",
            })
        );
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let api = client(Recorder::replying(Ok("<html>oops</html>")));
        let err = block_on(api.databases()).unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn status_errors_pass_through() {
        let api = client(Recorder::replying(Err(ApiError::Status { status: 503 })));
        let err = block_on(api.llm_config()).unwrap_err();
        assert_eq!(err, ApiError::Status { status: 503 });
    }
}
