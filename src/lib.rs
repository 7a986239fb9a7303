//! Mobile web client backend and session-keeping reverse proxy for the
//! qBittorrent WebUI API.

pub mod config;
pub mod error;
pub mod logging;
pub mod qbit;
pub mod routes;
