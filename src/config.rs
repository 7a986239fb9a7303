use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::qbit::{Credentials, API_PREFIX};

/// Mobile web client and session-keeping proxy for the qBittorrent WebUI
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// qBittorrent WebUI host
    #[arg(long, env = "QBITTORRENT_HOST", default_value = "localhost")]
    pub qbittorrent_host: String,

    /// qBittorrent WebUI port
    #[arg(long, env = "QBITTORRENT_PORT", default_value_t = 8080)]
    pub qbittorrent_port: u16,

    /// Leave empty to rely on the WebUI's local auth bypass
    #[arg(long, env = "QBITTORRENT_USERNAME", default_value = "")]
    pub qbittorrent_username: String,

    #[arg(long, env = "QBITTORRENT_PASSWORD", default_value = "", hide_env_values = true)]
    pub qbittorrent_password: String,

    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Built frontend; served only if the directory exists
    #[arg(long, env = "STATIC_DIR", default_value = "dist")]
    pub static_dir: PathBuf,

    /// Timeout for each downstream request, login included
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Largest inbound request body accepted, uploads included
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 100 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}

impl Config {
    /// Downstream API root, e.g. `http://localhost:8080/api/v2`
    pub fn downstream_base_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.qbittorrent_host, self.qbittorrent_port, API_PREFIX
        )
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.qbittorrent_username, &self.qbittorrent_password)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
