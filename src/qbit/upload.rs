//! Torrent upload adapter
//!
//! Rebuilds an inbound multipart upload into a fresh multipart body for
//! `/torrents/add`. Parts are retained as plain data so the body can be
//! rebuilt when the forwarder retries after a login.

use axum::body::Bytes;
use axum::extract::Multipart;
use reqwest::multipart::{Form, Part};

/// A file part of an upload, usually a `.torrent`
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Scalar fields and files destined for the add-torrent endpoint
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    fields: Vec<(String, String)>,
    files: Vec<UploadFile>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar field. Empty values are dropped.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_field(name.into(), value.into());
        self
    }

    pub fn file(mut self, file: UploadFile) -> Self {
        self.files.push(file);
        self
    }

    fn push_field(&mut self, name: String, value: String) {
        if value.is_empty() {
            tracing::debug!("Dropping empty upload field '{}'", name);
            return;
        }
        self.fields.push((name, value));
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    /// Build from already-decoded form pairs (adding by URL or magnet)
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::new();
        for (name, value) in pairs {
            form.push_field(name, value);
        }
        form
    }

    /// Drain an inbound multipart stream.
    ///
    /// Parts that carry a filename are files, the rest are scalar fields. A file
    /// part with an empty filename (an unused file input) is skipped.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, String> {
        let mut form = Self::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| format!("Multipart error: {}", e))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) if !file_name.is_empty() => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| format!("Failed to read file '{}': {}", file_name, e))?;
                    form.files.push(UploadFile {
                        field_name: name,
                        file_name,
                        content_type,
                        data,
                    });
                }
                Some(_) => {
                    tracing::debug!("Skipping file part '{}' without a filename", name);
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| format!("Failed to read field '{}': {}", name, e))?;
                    form.push_field(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Fresh reqwest multipart body for one send attempt
    pub fn to_multipart(&self) -> Form {
        let mut form = Form::new();

        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }

        for file in &self.files {
            let part = Part::bytes(file.data.to_vec()).file_name(file.file_name.clone());
            let part = match part.mime_str(&file.content_type) {
                Ok(part) => part,
                Err(_) => {
                    tracing::debug!(
                        "Invalid content type '{}' for '{}', sending without one",
                        file.content_type,
                        file.file_name
                    );
                    Part::bytes(file.data.to_vec()).file_name(file.file_name.clone())
                }
            };
            form = form.part(file.field_name.clone(), part);
        }

        form
    }
}
