//! Tracing subscriber setup for embedders and tools.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Installs a stderr subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info,spell::targets=debug"`).
///
/// Returns false if a global subscriber was already set.
pub fn init_tracing(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

/// Like [`init_tracing`] but writes to `dir/file_name` through a background
/// writer. Keep the guard alive for as long as logs should be flushed.
pub fn init_file_tracing(
    dir: impl AsRef<Path>,
    file_name: &str,
    default_directive: &str,
) -> std::io::Result<Option<WorkerGuard>> {
    std::fs::create_dir_all(dir.as_ref())?;
    let appender = tracing_appender::rolling::never(dir.as_ref(), file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .is_ok();

    Ok(installed.then_some(guard))
}
