use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::error::ApiError;
use crate::qbit::form::{parse_form, FORM_CONTENT_TYPE};
use crate::qbit::{ForwardBody, ForwardRequest, API_PREFIX};

/// Relay any `/api/v2/*` request to qBittorrent
pub async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = build_request(method, &uri, headers, body);
    tracing::debug!("Proxying {} {}", req.method, req.path);

    match state.forwarder.forward(&req).await {
        Ok(resp) => resp.into_response(),
        Err(e) => {
            tracing::error!("Proxy error for {} {}: {}", req.method, req.path, e);
            ApiError::internal("Proxy error").into_response()
        }
    }
}

/// Strip the inbound `/api/v2` prefix, keeping the query string.
/// The bare prefix maps to `/`.
pub(crate) fn downstream_path(uri: &Uri) -> String {
    let path = uri.path();
    let path = match path.strip_prefix(API_PREFIX).unwrap_or(path) {
        "" => "/",
        rest => rest,
    };
    match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    }
}

fn build_request(method: Method, uri: &Uri, headers: HeaderMap, body: Bytes) -> ForwardRequest {
    let req = ForwardRequest::new(method, downstream_path(uri));
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with(FORM_CONTENT_TYPE) {
        let pairs = parse_form(&String::from_utf8_lossy(&body));
        return req.with_body(ForwardBody::Form(pairs));
    }

    if content_type.starts_with("multipart/form-data") {
        return req.with_headers(headers).with_body(ForwardBody::Bytes(body));
    }

    if body.is_empty() {
        return req;
    }

    let mut passthrough = HeaderMap::new();
    if let Some(value) = headers.get(header::CONTENT_TYPE) {
        passthrough.insert(header::CONTENT_TYPE, value.clone());
    }
    req.with_headers(passthrough).with_body(ForwardBody::Bytes(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn content_type(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_downstream_path_keeps_query() {
        let uri: Uri = "/api/v2/torrents/info?filter=downloading&sort=name".parse().unwrap();
        assert_eq!(downstream_path(&uri), "/torrents/info?filter=downloading&sort=name");

        let uri: Uri = "/api/v2/app/version".parse().unwrap();
        assert_eq!(downstream_path(&uri), "/app/version");
    }

    #[test]
    fn test_bare_prefix_maps_to_root() {
        let uri: Uri = "/api/v2".parse().unwrap();
        assert_eq!(downstream_path(&uri), "/");

        let uri: Uri = "/api/v2?rid=1".parse().unwrap();
        assert_eq!(downstream_path(&uri), "/?rid=1");
    }

    #[test]
    fn test_form_body_is_parsed() {
        let uri: Uri = "/api/v2/torrents/delete".parse().unwrap();
        let req = build_request(
            Method::POST,
            &uri,
            content_type("application/x-www-form-urlencoded; charset=UTF-8"),
            Bytes::from_static(b"hashes=abc123&deleteFiles=true"),
        );

        match req.body {
            Some(ForwardBody::Form(pairs)) => assert_eq!(pairs.len(), 2),
            other => panic!("expected form body, got {:?}", other),
        }
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_multipart_keeps_headers() {
        let uri: Uri = "/api/v2/torrents/setCategory".parse().unwrap();
        let req = build_request(
            Method::POST,
            &uri,
            content_type("multipart/form-data; boundary=xyz"),
            Bytes::from_static(b"--xyz--\r\n"),
        );

        assert!(matches!(req.body, Some(ForwardBody::Bytes(_))));
        assert_eq!(
            req.headers.get(header::CONTENT_TYPE).unwrap(),
            "multipart/form-data; boundary=xyz"
        );
    }

    #[test]
    fn test_empty_body_is_absent() {
        let uri: Uri = "/api/v2/sync/maindata?rid=0".parse().unwrap();
        let req = build_request(Method::GET, &uri, HeaderMap::new(), Bytes::new());
        assert!(req.body.is_none());
        assert_eq!(req.path, "/sync/maindata?rid=0");
    }

    #[test]
    fn test_json_body_passes_through() {
        let uri: Uri = "/api/v2/app/setPreferences".parse().unwrap();
        let req = build_request(
            Method::POST,
            &uri,
            content_type("application/json"),
            Bytes::from_static(br#"{"dl_limit":0}"#),
        );

        match req.body {
            Some(ForwardBody::Bytes(body)) => assert_eq!(body.as_ref(), br#"{"dl_limit":0}"#),
            other => panic!("expected raw body, got {:?}", other),
        }
        assert_eq!(req.headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }
}
