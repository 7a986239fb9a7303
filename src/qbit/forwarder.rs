//! Session-authenticated forwarding to the qBittorrent WebUI API
//!
//! Every request carries the shared session cookie. A 401 triggers exactly one
//! login followed by exactly one retry; anything else is handed back as-is.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use reqwest::Client;

use super::form::{encode_form, FORM_CONTENT_TYPE};
use super::login::{login, LoginResult};
use super::session::{extract_sid, SessionStore};
use super::upload::UploadForm;
use super::{Credentials, DownstreamResponse};
use crate::error::ForwardError;

/// Inbound headers that never reach the downstream
static EXCLUDED_HEADERS: [HeaderName; 12] = [
    header::HOST,
    header::CONTENT_LENGTH,
    header::COOKIE,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHORIZATION,
    header::ACCEPT_ENCODING,
    // qBittorrent rejects requests whose Origin/Referer don't match its own host
    header::ORIGIN,
    header::REFERER,
];

/// Payload of a forwarded request
#[derive(Debug, Clone)]
pub enum ForwardBody {
    /// Sent verbatim
    Bytes(Bytes),
    /// Re-encoded as `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// Rebuilt as `multipart/form-data` on every attempt
    Upload(UploadForm),
}

/// A request to relay, `path` relative to the API root (`/torrents/info?filter=all`)
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<ForwardBody>,
    pub headers: HeaderMap,
}

impl ForwardRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_body(mut self, body: ForwardBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    RetryAfterLogin,
}

pub struct Forwarder {
    client: Client,
    base_url: String,
    credentials: Credentials,
    session: Arc<SessionStore>,
}

impl Forwarder {
    /// `base_url` is the downstream API root, e.g. `http://localhost:8080/api/v2`
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        credentials: Credentials,
        session: Arc<SessionStore>,
    ) -> Result<Self, ForwardError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| ForwardError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            credentials,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Send `req` downstream, logging in and retrying once on 401.
    ///
    /// Only transport failures are errors. Every HTTP status, including a 401
    /// that survived the retry, comes back as a response.
    pub async fn forward(&self, req: &ForwardRequest) -> Result<DownstreamResponse, ForwardError> {
        let mut attempt = Attempt::First;

        loop {
            let resp = self.send(req, attempt).await?;
            if resp.status != StatusCode::UNAUTHORIZED {
                return Ok(resp);
            }

            match attempt {
                Attempt::First => {
                    tracing::info!("Got 401 for {} {}, logging in", req.method, req.path);
                    match self.establish_session().await {
                        LoginResult::SessionEstablished(_) | LoginResult::BypassAccepted => {
                            attempt = Attempt::RetryAfterLogin;
                        }
                        LoginResult::LoginRejected => return Ok(resp),
                    }
                }
                Attempt::RetryAfterLogin => {
                    tracing::warn!(
                        "Still unauthorized after login for {} {}",
                        req.method,
                        req.path
                    );
                    return Ok(resp);
                }
            }
        }
    }

    /// Log in with the configured credentials and store the outcome.
    ///
    /// Transport errors during login count as a rejection.
    pub async fn establish_session(&self) -> LoginResult {
        let result = match login(&self.client, &self.base_url, &self.credentials).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("qBittorrent login failed: {}", e);
                return LoginResult::LoginRejected;
            }
        };

        match &result {
            LoginResult::SessionEstablished(cookie) => self.session.set_token(cookie.clone()).await,
            LoginResult::BypassAccepted => self.session.clear_token().await,
            LoginResult::LoginRejected => {}
        }
        result
    }

    async fn send(
        &self,
        req: &ForwardRequest,
        attempt: Attempt,
    ) -> Result<DownstreamResponse, ForwardError> {
        let url = format!("{}{}", self.base_url, req.path);
        let token = self.session.token().await;

        let mut headers = forwardable_headers(&req.headers);
        match &req.body {
            Some(ForwardBody::Form(_)) => {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
            }
            Some(ForwardBody::Upload(_)) => {
                headers.remove(header::CONTENT_TYPE);
            }
            Some(ForwardBody::Bytes(_)) | None => {}
        }
        let cookie = HeaderValue::from_str(token.cookie_header())
            .unwrap_or_else(|_| HeaderValue::from_static(""));
        headers.insert(header::COOKIE, cookie);

        tracing::debug!("Forwarding {} {} ({:?})", req.method, url, attempt);

        let mut builder = self.client.request(req.method.clone(), &url).headers(headers);
        builder = match &req.body {
            None => builder,
            Some(ForwardBody::Bytes(bytes)) => builder.body(bytes.clone()),
            Some(ForwardBody::Form(pairs)) => builder.body(encode_form(pairs)),
            Some(ForwardBody::Upload(form)) => builder.multipart(form.to_multipart()),
        };

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!("{} {} failed: {}", req.method, url, e);
                return Err(e.into());
            }
        };
        let resp = DownstreamResponse::read(resp).await?;

        if resp.status.is_success() {
            self.remember_cookie(&resp.headers).await;
        }
        Ok(resp)
    }

    async fn remember_cookie(&self, headers: &HeaderMap) {
        let sid = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(extract_sid);

        if let Some(cookie) = sid {
            self.session.set_token(cookie).await;
        }
    }
}

fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if !EXCLUDED_HEADERS.contains(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}
