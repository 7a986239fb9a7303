//! Login against the qBittorrent WebUI

use axum::http::header;
use reqwest::Client;

use super::{session::extract_sid, Credentials, DownstreamResponse, LOGIN_PATH};
use crate::error::ForwardError;

/// Body the WebUI returns for an accepted login
pub const LOGIN_OK: &str = "Ok.";

/// Outcome of a single login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginResult {
    /// Credentials accepted and a session cookie issued
    SessionEstablished(String),
    /// Login acknowledged without a cookie; downstream auth is bypassed
    BypassAccepted,
    /// Credentials refused or an unrecognised reply
    LoginRejected,
}

/// Interpret a login reply.
///
/// A `SID` cookie wins over the body; without one, only a 2xx with the exact
/// `Ok.` marker counts as success.
pub fn classify(resp: &DownstreamResponse) -> LoginResult {
    if !resp.status.is_success() {
        return LoginResult::LoginRejected;
    }

    let sid = resp
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(extract_sid);

    match sid {
        Some(cookie) => LoginResult::SessionEstablished(cookie),
        None if resp.body.as_ref() == LOGIN_OK.as_bytes() => LoginResult::BypassAccepted,
        None => LoginResult::LoginRejected,
    }
}

/// POST the credentials to the login endpoint of `base_url`
pub async fn login(
    client: &Client,
    base_url: &str,
    credentials: &Credentials,
) -> Result<LoginResult, ForwardError> {
    let url = format!("{}{}", base_url, LOGIN_PATH);
    tracing::debug!("Logging in to qBittorrent at {}", url);

    let resp = client
        .post(&url)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(credentials.form_body())
        .send()
        .await?;
    let resp = DownstreamResponse::read(resp).await?;

    let result = classify(&resp);
    if result == LoginResult::LoginRejected {
        tracing::warn!(
            "qBittorrent rejected login (HTTP {}): {}",
            resp.status,
            resp.text()
        );
    }
    Ok(result)
}
