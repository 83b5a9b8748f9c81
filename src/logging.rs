use std::io::IsTerminal;

/// Directive used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "tm2bd=debug" } else { "warn" }
}

/// Install the stderr subscriber. `RUST_LOG` takes precedence over `--verbose`.
/// Stdout stays reserved for the command result.
pub fn init(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(verbose).into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_crate_debug() {
        assert_eq!(default_directive(true), "tm2bd=debug");
        assert_eq!(default_directive(false), "warn");
    }
}
