//! Shared qBittorrent session state
//!
//! One session backs every forwarded request, regardless of which inbound
//! caller triggered the login that produced it.

use tokio::sync::RwLock;

/// Authentication state held for the downstream account
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionToken {
    /// No login has succeeded yet
    #[default]
    Unauthenticated,
    /// Cookie pair issued by qBittorrent, e.g. `SID=abc123`
    Cookie(String),
    /// Downstream accepted the login without issuing a cookie (auth bypassed)
    Bypass,
}

impl SessionToken {
    /// Value for the outbound `Cookie` header. Empty unless a cookie is held.
    pub fn cookie_header(&self) -> &str {
        match self {
            SessionToken::Cookie(cookie) => cookie,
            SessionToken::Unauthenticated | SessionToken::Bypass => "",
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    token: RwLock<SessionToken>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn token(&self) -> SessionToken {
        self.token.read().await.clone()
    }

    /// Replace the held cookie. Last write wins.
    pub async fn set_token(&self, cookie: impl Into<String>) {
        let cookie = cookie.into();
        let mut token = self.token.write().await;
        if *token != SessionToken::Cookie(cookie.clone()) {
            tracing::info!("Stored new qBittorrent session cookie");
        }
        *token = SessionToken::Cookie(cookie);
    }

    /// Drop any held cookie and mark the session as bypassed
    pub async fn clear_token(&self) {
        let mut token = self.token.write().await;
        if *token != SessionToken::Bypass {
            tracing::info!("qBittorrent accepted login without a cookie, using bypass mode");
        }
        *token = SessionToken::Bypass;
    }
}

/// Pull the `SID=...` pair out of a `Set-Cookie` header value
///
/// Attributes after the first `;` are discarded.
pub fn extract_sid(set_cookie: &str) -> Option<String> {
    if !set_cookie.contains("SID=") {
        return None;
    }
    let pair = set_cookie.split(';').next()?.trim();
    if pair.is_empty() {
        None
    } else {
        Some(pair.to_string())
    }
}
