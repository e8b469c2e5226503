use crate::core::error::{AppError, AppResult};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("gdpx/", env!("CARGO_PKG_VERSION"));

/// Maps a transport-level failure onto the error taxonomy.
///
/// Timeouts, refused connections and connections dropped while sending or
/// reading are `SourceUnavailable`; anything else is reported as invalid data.
pub fn classify_request_error(source: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        AppError::SourceUnavailable(format!("{source}: {err}"))
    } else {
        AppError::SourceDataInvalid(format!("{source}: {err}"))
    }
}

fn classify_status(source: &str, status: StatusCode) -> AppError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        AppError::SourceUnavailable(format!("{source}: HTTP {status}"))
    } else {
        AppError::SourceDataInvalid(format!("{source}: HTTP {status}"))
    }
}

/// Issues a single GET bounded by `timeout` and returns the body text.
///
/// No retries: one failed request fails the caller.
pub async fn fetch_text(source: &str, url: &str, timeout: Duration) -> AppResult<String> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| classify_request_error(source, e))?;

    debug!("Requesting {} from {}", source, url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_request_error(source, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(source, status));
    }

    let text = response
        .text()
        .await
        .map_err(|e| classify_request_error(source, e))?;

    if text.trim().is_empty() {
        return Err(AppError::SourceDataInvalid(format!(
            "{source}: empty response body"
        )));
    }
    Ok(text)
}
