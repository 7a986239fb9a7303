//! Typed helpers for common WebUI calls, all routed through the [`Forwarder`]

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use super::forwarder::{ForwardBody, ForwardRequest, Forwarder};
use super::upload::UploadForm;
use super::{DownstreamResponse, ADD_TORRENT_PATH};

/// Subset of the `/torrents/info` entry the proxy cares about
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfo {
    pub hash: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferInfo {
    pub dl_info_speed: u64,
    pub up_info_speed: u64,
    #[serde(default)]
    pub connection_status: String,
}

#[derive(Clone)]
pub struct QbitApi {
    forwarder: Arc<Forwarder>,
}

impl QbitApi {
    pub fn new(forwarder: Arc<Forwarder>) -> Self {
        Self { forwarder }
    }

    pub async fn app_version(&self) -> Result<String> {
        let resp = self.call(ForwardRequest::get("/app/version")).await?;
        Ok(resp.text().trim().to_string())
    }

    pub async fn transfer_info(&self) -> Result<TransferInfo> {
        let resp = self.call(ForwardRequest::get("/transfer/info")).await?;
        serde_json::from_slice(&resp.body).context("Failed to parse transfer info")
    }

    /// List torrents, optionally narrowed by state filter and category
    pub async fn torrents(
        &self,
        filter: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<TorrentInfo>> {
        let mut query = Vec::new();
        if let Some(filter) = filter {
            query.push(format!("filter={}", urlencoding::encode(filter)));
        }
        if let Some(category) = category {
            query.push(format!("category={}", urlencoding::encode(category)));
        }
        let path = if query.is_empty() {
            "/torrents/info".to_string()
        } else {
            format!("/torrents/info?{}", query.join("&"))
        };

        let resp = self.call(ForwardRequest::get(path)).await?;
        serde_json::from_slice(&resp.body)
            .with_context(|| format!("Failed to parse torrent list: {}", resp.text()))
    }

    pub async fn pause(&self, hash: &str) -> Result<()> {
        self.post_form("/torrents/pause", vec![("hashes", hash)]).await
    }

    pub async fn resume(&self, hash: &str) -> Result<()> {
        self.post_form("/torrents/resume", vec![("hashes", hash)]).await
    }

    pub async fn delete(&self, hash: &str, delete_files: bool) -> Result<()> {
        let delete_files = delete_files.to_string();
        self.post_form(
            "/torrents/delete",
            vec![("hashes", hash), ("deleteFiles", delete_files.as_str())],
        )
        .await
    }

    /// Add magnet links or torrent URLs, one per line downstream
    pub async fn add_urls(&self, urls: &[&str], category: Option<&str>) -> Result<()> {
        let form = UploadForm::new()
            .field("urls", urls.join("\n"))
            .field("category", category.unwrap_or_default());
        let req = ForwardRequest::post(ADD_TORRENT_PATH).with_body(ForwardBody::Upload(form));

        let resp = self.call(req).await?;
        if resp.text().trim() == "Fails." {
            return Err(anyhow!("qBittorrent refused to add {} url(s)", urls.len()));
        }
        Ok(())
    }

    async fn post_form(&self, path: &str, pairs: Vec<(&str, &str)>) -> Result<()> {
        let pairs = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let req = ForwardRequest::post(path).with_body(ForwardBody::Form(pairs));
        self.call(req).await?;
        Ok(())
    }

    async fn call(&self, req: ForwardRequest) -> Result<DownstreamResponse> {
        let resp = self
            .forwarder
            .forward(&req)
            .await
            .with_context(|| format!("{} {} failed", req.method, req.path))?;

        if !resp.status.is_success() {
            return Err(anyhow!(
                "{} {} returned HTTP {}: {}",
                req.method,
                req.path,
                resp.status,
                resp.text()
            ));
        }
        Ok(resp)
    }
}
