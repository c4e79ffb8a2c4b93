use std::io;
use tracing_subscriber::{fmt, EnvFilter};

/// Default directives when `RUST_LOG` is unset. Auth decisions log at info;
/// per-request rejection reasons sit at debug under `service::auth`.
pub const DEFAULT_FILTER: &str = "info,tower_http=info,axum=info,service::auth=info";

/// Output format of the process-wide subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; everything else is compact.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber on stdout. A second call is a no-op, so
/// tests may call this freely.
pub fn init_logging(format: LogFormat) {
    let builder = fmt().with_env_filter(env_filter()).with_writer(io::stdout);
    let _ = match format {
        LogFormat::Compact => builder.with_target(false).compact().try_init(),
        LogFormat::Json => builder.with_target(true).json().try_init(),
    };
}

pub fn init_logging_default() {
    init_logging(LogFormat::Compact)
}

/// Structured JSON lines with targets, for log shippers.
pub fn init_logging_json() {
    init_logging(LogFormat::Json)
}

/// Format from `LOG_FORMAT`.
pub fn init_logging_from_env() {
    init_logging(LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref()))
}
