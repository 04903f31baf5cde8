//! Tracing setup.
//!
//! The filter comes from `RUST_LOG` when set, otherwise `info`. It sits behind
//! a reload layer so `APOLLO_DEBUG`, which is only known once the environment
//! has been resolved, can still raise it to `debug`.

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

const DEFAULT_LEVEL: &str = "info";

/// Handle to the installed log filter.
#[derive(Clone)]
pub struct LogFilter {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
    from_env: bool,
}

impl LogFilter {
    /// Swaps the active filter for `directives`.
    pub fn set(&self, directives: &str) {
        let Some(handle) = &self.handle else {
            return;
        };
        match EnvFilter::try_new(directives) {
            Ok(filter) => {
                if let Err(e) = handle.reload(filter) {
                    tracing::warn!(error = %e, "Could not reload log filter");
                }
            }
            Err(e) => tracing::warn!(directives, error = %e, "Ignoring invalid log filter"),
        }
    }

    /// Raises the level to `debug` when the toggle is on and `RUST_LOG` did
    /// not pick a filter.
    pub fn apply_debug_toggle(&self, debug: bool) {
        if debug && !self.from_env {
            self.set("debug");
            tracing::debug!("APOLLO_DEBUG enabled, log level raised to debug");
        }
    }
}

/// Installs the global subscriber. A second call leaves the first subscriber
/// in place and returns an inert handle.
pub fn init_tracing() -> LogFilter {
    let env_filter = std::env::var_os("RUST_LOG")
        .and_then(|_| EnvFilter::try_from_default_env().ok());
    let from_env = env_filter.is_some();
    let filter = env_filter.unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL));

    let (reload_layer, handle) = reload::Layer::new(filter);
    let installed = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer())
        .try_init()
        .is_ok();

    LogFilter {
        handle: installed.then_some(handle),
        from_env,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inert_handle_ignores_updates() {
        let filter = LogFilter {
            handle: None,
            from_env: false,
        };
        filter.set("debug");
        filter.apply_debug_toggle(true);
    }
}
