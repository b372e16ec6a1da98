//! Tracing setup for the `loginstress` binary.
//!
//! `RUST_LOG` is honored; `info` applies when it is unset. `--debug` always
//! raises this crate to `debug` on top of that, since page snippets and
//! response bodies are emitted at debug level.

use loginstress_common::LoggingConfig;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "info";
const DEBUG_DIRECTIVE: &str = "loginstress=debug";

/// Builds the filter from an optional `RUST_LOG` value.
///
/// An unparsable `RUST_LOG` falls back to the default rather than failing the run.
pub fn build_filter(env: Option<&str>, debug: bool) -> EnvFilter {
    let filter = env
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE));

    if !debug {
        return filter;
    }
    match DEBUG_DIRECTIVE.parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Installs the global subscriber. Output goes to stderr, JSON or compact.
pub fn init(config: &LoggingConfig, debug: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let registry = tracing_subscriber::registry().with(build_filter(env.as_deref(), debug));

    if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}
