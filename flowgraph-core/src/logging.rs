//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The library only emits events; hosts that want to see them call
//! [`init_logging`] once at startup. What the crate logs, by target:
//!
//! - `flowgraph_core::graph`: operator and link edits (`debug`)
//! - `flowgraph_core::eval`: evaluations and computed operators (`debug`),
//!   cache hits (`trace`), cycles cut under `use_cached` (`warn`)
//! - `flowgraph_core::traversal`: finished walks (`trace`)
//!
//! Filtering accepts `EnvFilter` directives, so a single module can be
//! turned up, e.g. `flowgraph_core::eval=trace`. Directives come from the
//! argument, then `FLOWGRAPH_LOG`, then default to `info`. Output goes to
//! stderr.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted when no directives are passed.
pub const LOG_ENV: &str = "FLOWGRAPH_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Install a global `fmt` subscriber.
///
/// Returns `false` if a global subscriber was already installed, which
/// happens when tests call this repeatedly.
pub fn init_logging(directives: Option<&str>) -> bool {
    let env = std::env::var(LOG_ENV).ok();
    fmt()
        .with_env_filter(filter(directives, env.as_deref()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// First of `directives` and `env` that parses, else the default.
fn filter(directives: Option<&str>, env: Option<&str>) -> EnvFilter {
    [directives, env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .find_map(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(filter: EnvFilter) -> String {
        filter.to_string().to_lowercase()
    }

    #[test]
    fn argument_wins_over_environment() {
        let f = filter(Some("flowgraph_core::eval=trace"), Some("warn"));
        assert!(shown(f).contains("flowgraph_core::eval=trace"));
    }

    #[test]
    fn environment_used_without_argument() {
        let f = filter(None, Some("flowgraph_core::graph=debug"));
        assert!(shown(f).contains("flowgraph_core::graph=debug"));
    }

    #[test]
    fn unusable_directives_fall_back() {
        // Not a level, so the directive is rejected.
        let f = filter(Some("flowgraph_core=loud"), Some("  "));
        assert_eq!(shown(f), DEFAULT_DIRECTIVES);
        assert_eq!(shown(filter(None, None)), DEFAULT_DIRECTIVES);
    }

    #[test]
    fn second_init_is_harmless() {
        init_logging(Some("trace"));
        assert!(!init_logging(Some("info")));
    }
}
