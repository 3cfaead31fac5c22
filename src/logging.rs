//! Diagnostic logging setup.
//!
//! User-facing output goes to stdout with `println!`; everything emitted
//! through `tracing` lands on stderr so it never mixes with command output.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

const DEFAULT_LEVEL: &str = "warn";
const DEBUG_LEVEL: &str = "debug";

/// Picks the filter directive. `RUST_LOG` wins over the `--debug` flag.
pub fn filter_directive(debug: bool, rust_log: Option<&str>) -> String {
    match rust_log {
        Some(directive) if !directive.trim().is_empty() => directive.to_string(),
        _ if debug => DEBUG_LEVEL.to_string(),
        _ => DEFAULT_LEVEL.to_string(),
    }
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init(debug: bool) {
    INIT.call_once(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        let filter = EnvFilter::new(filter_directive(debug, rust_log.as_deref()));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    });
}
