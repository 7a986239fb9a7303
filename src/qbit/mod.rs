pub mod api;
pub mod form;
pub mod forwarder;
pub mod login;
pub mod session;
pub mod upload;

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use url::form_urlencoded;

pub use forwarder::{ForwardBody, ForwardRequest, Forwarder};
pub use session::SessionStore;

/// Path prefix of the qBittorrent WebUI API, both inbound and downstream
pub const API_PREFIX: &str = "/api/v2";
/// Downstream login endpoint, relative to [`API_PREFIX`]
pub const LOGIN_PATH: &str = "/auth/login";
/// Downstream add-torrent endpoint, relative to [`API_PREFIX`]
pub const ADD_TORRENT_PATH: &str = "/torrents/add";

/// Build the HTTP client used for every downstream call.
/// The timeout applies per request, login included.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(4)
        .build()
}

/// Username/password pair for the downstream WebUI
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Form body for the login call.
    ///
    /// Without a username both fields are sent empty, which a WebUI with
    /// local auth bypass accepts.
    pub fn form_body(&self) -> String {
        if self.username.is_empty() {
            return "username=&password=".to_string();
        }
        form_urlencoded::Serializer::new(String::new())
            .append_pair("username", &self.username)
            .append_pair("password", &self.password)
            .finish()
    }
}

/// A complete downstream response, body fully buffered
#[derive(Debug, Clone)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl DownstreamResponse {
    pub(crate) async fn read(resp: reqwest::Response) -> reqwest::Result<Self> {
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl IntoResponse for DownstreamResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        if let Some(content_type) = self.headers.get(header::CONTENT_TYPE) {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type.clone());
        }
        response
    }
}
