//! Tracing initialisation for hosts embedding AECU.
//!
//! Filter precedence: `AECU_LOG`, then `RUST_LOG`, then
//! [`default_directives`] for the requested level.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding AECU-specific filter directives.
pub const LOG_ENV: &str = "AECU_LOG";

/// AECU crates at `level`, everything else at `warn`.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,aecu_core={level},aecu_repository={level}")
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber, as JSON lines when `json` is set.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter(level));
    let installed = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    installed.is_ok()
}
