//! Tracing subscriber setup.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVE: &str = "clearbar=info,clearbar_lib=info";

/// Filter used with `--verbose` when `RUST_LOG` is not set.
const VERBOSE_DIRECTIVE: &str = "clearbar=debug,clearbar_lib=debug";

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_DIRECTIVE } else { DEFAULT_DIRECTIVE })
    })
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
        tracing::debug!("logging: still usable");
    }
}
