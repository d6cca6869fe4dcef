//! HTTP failure classification.
//!
//! Maps transport errors and non-success statuses onto
//! [`GenerationError`] so that the orchestrator can tell a retryable outage
//! from an answer that will never be usable.

use std::time::Duration;

use pipeline::GenerationError;
use reqwest::StatusCode;

/// Fallback hint when a 429 carries no usable `Retry-After`.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Bodies echoed into error messages are cut to this many characters.
const MAX_ECHOED_BODY: usize = 300;

/// Returns the response unchanged on success.
///
/// - 429 → [`GenerationError::Transient`] with a `Retry-After` hint
///   (60 s when absent or unparseable).
/// - 408 and 5xx → [`GenerationError::Transient`], hint only when the server
///   sent one.
/// - 401 and 403 → [`GenerationError::Unauthorized`], which stops the run.
/// - Any other non-success → [`GenerationError::InvalidResponse`].
pub(crate) async fn check_response(
    resp: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = parse_retry_after(&resp);
    let body = resp.text().await.unwrap_or_default();
    let message = format!("API error ({}): {}", status.as_u16(), truncate(&body));

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(GenerationError::Transient {
            message,
            retry_after: Some(retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT)),
        });
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GenerationError::Unauthorized { message });
    }
    if status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
        return Err(GenerationError::Transient {
            message,
            retry_after,
        });
    }
    Err(GenerationError::invalid(message))
}

/// Maps a transport-level failure.
pub(crate) fn transport_error(err: &reqwest::Error, timeout: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout { after: timeout }
    } else if err.is_decode() {
        GenerationError::invalid(format!("response body could not be decoded: {err}"))
    } else {
        GenerationError::transient(format!("HTTP error: {err}"))
    }
}

fn parse_retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_ECHOED_BODY {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(MAX_ECHOED_BODY).collect();
        cut.push('…');
        cut
    }
}
