use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use futures::future::{self, Either};
use gloo_net::http::{Request, Response};
use gloo_timers::future::TimeoutFuture;
use sqlagent_ui::api::Transport;
use sqlagent_ui::error::ApiError;
use web_sys::AbortController;

/// [`Transport`] over the browser's `fetch`. A request that outlives its
/// deadline is aborted.
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchTransport;

impl Transport for FetchTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<String, ApiError> {
        let abort = abort_controller()?;
        let request = Request::get(url).abort_signal(Some(&abort.signal()));
        with_deadline(&abort, timeout, async move {
            let response = request.send().await.map_err(fetch_error)?;
            read_body(response).await
        })
        .await
    }

    async fn post_json(
        &self,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<String, ApiError> {
        let abort = abort_controller()?;
        let request = Request::post(url)
            .abort_signal(Some(&abort.signal()))
            .header("Content-Type", "application/json")
            .body(body)
            .map_err(|err| ApiError::Encode {
                message: err.to_string(),
            })?;
        with_deadline(&abort, timeout, async move {
            let response = request.send().await.map_err(fetch_error)?;
            read_body(response).await
        })
        .await
    }
}

fn abort_controller() -> Result<AbortController, ApiError> {
    AbortController::new().map_err(|_| ApiError::transport("AbortController is unavailable"))
}

async fn with_deadline<F>(
    abort: &AbortController,
    timeout: Duration,
    request: F,
) -> Result<String, ApiError>
where
    F: Future<Output = Result<String, ApiError>>,
{
    let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
    let request = pin!(request);
    let deadline = pin!(TimeoutFuture::new(millis));

    match future::select(request, deadline).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => {
            abort.abort();
            Err(ApiError::Timeout { after: timeout })
        }
    }
}

async fn read_body(response: Response) -> Result<String, ApiError> {
    if !response.ok() {
        return Err(ApiError::Status {
            status: response.status(),
        });
    }
    response.text().await.map_err(fetch_error)
}

fn fetch_error(err: gloo_net::Error) -> ApiError {
    ApiError::transport(err.to_string())
}
