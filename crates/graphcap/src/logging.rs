//! Logging initialization.
//!
//! Logs go to stderr; stdout carries results so it can be piped.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose logs follow `--verbose`; everything else stays at `warn`.
const OWN_CRATES: &[&str] = &["graphcap", "graphcap_core"];

/// Initialize the global subscriber.
///
/// `RUST_LOG` replaces the computed filter when set.
pub fn init(verbose: bool, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(verbose)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    let mut directives = vec!["warn".to_string()];
    directives.extend(OWN_CRATES.iter().map(|c| format!("{c}={level}")));
    directives.join(",")
}
