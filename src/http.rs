use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;

use crate::api::Transport;
use crate::error::ApiError;

/// [`Transport`] over `reqwest`, for the native console front end.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sqlagent-ui/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed building HTTP client")?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<String, ApiError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| request_error(err, timeout))?;
        read_body(response, timeout).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<String, ApiError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| request_error(err, timeout))?;
        read_body(response, timeout).await
    }
}

async fn read_body(response: reqwest::Response, timeout: Duration) -> Result<String, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
        });
    }
    response
        .text()
        .await
        .map_err(|err| request_error(err, timeout))
}

fn request_error(err: reqwest::Error, timeout: Duration) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout { after: timeout }
    } else {
        ApiError::transport(err.to_string())
    }
}
