//! Logging configuration for whereabouts.
//!
//! Sets up the tracing subscriber used by the CLI. Library code only emits
//! events; it never installs a subscriber on its own.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Normal output level (info and above).
    #[default]
    Normal,
    /// Verbose output (debug and above).
    Verbose,
    /// Very verbose output (trace level).
    Trace,
}

impl Verbosity {
    /// The level directive this verbosity applies to whereabouts crates.
    #[must_use]
    pub fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "info",
            Self::Verbose => "debug",
            Self::Trace => "trace",
        }
    }

    /// Map `-q` / `-v` flag counts to a verbosity.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Trace,
        }
    }
}

/// Crates whose events the default filter lets through.
const LOG_TARGETS: &[&str] = &["whereabouts", "whereabouts_linux"];

/// Filter used when `RUST_LOG` is unset: `verbosity` for our crates, nothing
/// from dependencies.
#[must_use]
pub fn default_filter(verbosity: Verbosity) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={}", verbosity.directive()))
        .collect::<Vec<_>>()
        .join(",")
}

/// `rust_log` if it parses, otherwise [`default_filter`].
fn resolve_filter(rust_log: Option<&str>, verbosity: Verbosity) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter(verbosity)))
}

/// Initialize the logging system.
///
/// `RUST_LOG` takes precedence over `verbosity` when set. Logs go to stderr so
/// JSON written to stdout stays machine-readable.
///
/// # Examples
///
/// ```no_run
/// use whereabouts::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = resolve_filter(rust_log.as_deref(), verbosity);

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(false)
            .with_line_number(false),
    );

    // A subscriber may already be installed
    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_both_crates() {
        assert_eq!(
            default_filter(Verbosity::Normal),
            "whereabouts=info,whereabouts_linux=info"
        );
        assert_eq!(
            default_filter(Verbosity::Quiet),
            "whereabouts=error,whereabouts_linux=error"
        );
        assert_eq!(
            default_filter(Verbosity::Trace),
            "whereabouts=trace,whereabouts_linux=trace"
        );
    }

    #[test]
    fn test_default_filter_parses_at_every_verbosity() {
        for verbosity in [
            Verbosity::Quiet,
            Verbosity::Normal,
            Verbosity::Verbose,
            Verbosity::Trace,
        ] {
            assert!(EnvFilter::try_new(default_filter(verbosity)).is_ok());
        }
    }

    #[test]
    fn test_rust_log_overrides_verbosity() {
        let filter = resolve_filter(Some("whereabouts::capture=trace"), Verbosity::Quiet);
        let shown = filter.to_string().to_lowercase();
        assert!(shown.contains("whereabouts::capture=trace"));
        assert!(!shown.contains("whereabouts_linux"));
    }

    #[test]
    fn test_unusable_rust_log_falls_back() {
        for rust_log in [None, Some(""), Some("  "), Some("whereabouts=[")] {
            let shown = resolve_filter(rust_log, Verbosity::Verbose)
                .to_string()
                .to_lowercase();
            assert!(shown.contains("whereabouts_linux=debug"), "{rust_log:?}: {shown}");
        }
    }

    #[test]
    fn test_quiet_wins_over_verbose_flags() {
        assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::default());
        assert_eq!(Verbosity::from_flags(false, 7), Verbosity::Trace);
    }

    #[test]
    fn test_init_logging_twice_keeps_first_subscriber() {
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Trace);
    }
}
