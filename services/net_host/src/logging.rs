//! Tracing subscriber setup

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use worker_config::env::TRACE_SWITCH;

/// Filter directive from the configured level; the trace switch forces `trace`
pub fn filter_directive(level: &str, trace_switch: Option<&str>) -> String {
    if trace_switch.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
        "trace".to_string()
    } else {
        level.to_lowercase()
    }
}

/// Install the global subscriber; `RUST_LOG` takes precedence when set
pub fn init_logging(level: &str) -> Result<()> {
    let switch = std::env::var(TRACE_SWITCH).ok();
    let directive = filter_directive(level, switch.as_deref());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}
