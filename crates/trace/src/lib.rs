//! Installs a global `tracing` subscriber before any test runs.
//!
//! Nothing is installed unless `PAYOUT_TRACE` is set:
//!
//! - `1`, `true`, `on`: default format on stdout
//! - `compact`, `pretty`: the corresponding format on stdout
//! - `log-file`: daily rolling file under `PAYOUT_TRACE_PATH`
//! - `log-show`: the rolling file plus stderr
//!
//! Filtering follows `RUST_LOG`. A crate opts in with
//! `payout_snapshot_trace::enable_tracing!();` at its root.

#![deny(unused_crate_dependencies)]
#![deny(clippy::cast_possible_truncation)]

use ctor::ctor;
use std::env::var;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    EnvFilter,
    FmtSubscriber,
    fmt::format,
    prelude::*,
};

#[ctor]
pub static TRACE: () = {
    if let Ok(mode) = var("PAYOUT_TRACE") {
        init(&mode.to_lowercase());
    }
};

fn log_file() -> RollingFileAppender {
    let log_path = var("PAYOUT_TRACE_PATH")
        .unwrap_or_else(|_| concat!(env!("CARGO_MANIFEST_DIR"), "/logs").to_string());
    tracing_appender::rolling::daily(log_path, "payout-snapshot.log")
}

fn init(mode: &str) {
    // `try_init` fails when another subscriber is already installed, which is fine.
    match mode {
        "1" | "true" | "on" => FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init()
            .ok(),
        "compact" => FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .event_format(format().compact())
            .try_init()
            .ok(),
        "pretty" => FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .event_format(format().pretty())
            .try_init()
            .ok(),
        "log-file" => FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .event_format(format().compact())
            // Escape codes end up verbatim in files.
            .with_ansi(false)
            .with_writer(log_file())
            .try_init()
            .ok(),
        "log-show" => tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(false)
                    .with_writer(log_file()),
            )
            .try_init()
            .ok(),
        _ => {
            eprintln!("PAYOUT_TRACE={mode} is not a known mode");
            None
        }
    };
}

#[macro_export]
macro_rules! enable_tracing {
    () => {
        static _TRACE: &$crate::TRACE<()> = &$crate::TRACE;
    };
}
