//! Startup session check against the HTTP session endpoint.

use reqwest::header::COOKIE;
use url::Url;

/// Ask the server whether the session endpoint is reachable and answers
/// successfully for these cookies.
///
/// Network failures are returned as errors; the caller treats them the same
/// as a non-success status.
pub async fn check_session(
    client: &reqwest::Client,
    url: &Url,
    cookie: Option<&str>,
) -> Result<bool, reqwest::Error> {
    let mut request = client.get(url.clone());
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    let response = request.send().await?;
    tracing::debug!(status = %response.status(), %url, "session check");
    Ok(response.status().is_success())
}
