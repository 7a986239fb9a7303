use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::error::ApiError;
use crate::qbit::form::parse_form;
use crate::qbit::upload::UploadForm;
use crate::qbit::{ForwardBody, ForwardRequest, ADD_TORRENT_PATH};

/// `POST /api/v2/torrents/add`: torrent files and/or URLs
pub async fn add_torrent(State(state): State<AppState>, request: Request) -> Response {
    let form = match read_upload(&state, request).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    tracing::info!(
        "Uploading torrent: {} file(s), fields {:?}",
        form.files().len(),
        form.fields().iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>()
    );

    let req = ForwardRequest::post(ADD_TORRENT_PATH).with_body(ForwardBody::Upload(form));
    match state.forwarder.forward(&req).await {
        Ok(resp) => resp.into_response(),
        Err(e) => {
            tracing::error!("Torrent upload error: {}", e);
            ApiError::internal("Upload failed").into_response()
        }
    }
}

async fn read_upload(state: &AppState, request: Request) -> Result<UploadForm, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        return UploadForm::from_multipart(multipart)
            .await
            .map_err(ApiError::bad_request);
    }

    let body = Bytes::from_request(request, state)
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?;
    Ok(UploadForm::from_pairs(parse_form(&String::from_utf8_lossy(&body))))
}
