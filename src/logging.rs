use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RFC 3339 timestamps in local time
struct LocalTimer;

impl fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().to_rfc3339())
    }
}

/// Console logging, filtered by `RUST_LOG`
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    let console = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_timer(LocalTimer);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .try_init();
}
