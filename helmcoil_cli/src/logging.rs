//! Tracing subscriber setup: console layer on stderr plus an optional
//! JSON-lines file layer.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::FILE_GUARD;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn rotation(name: Option<&str>) -> eyre::Result<Rotation> {
    match name.unwrap_or("never") {
        "never" => Ok(Rotation::NEVER),
        "daily" => Ok(Rotation::DAILY),
        "hourly" => Ok(Rotation::HOURLY),
        other => eyre::bail!("logging.rotation must be never|daily|hourly, got {other:?}"),
    }
}

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG` when set, else from `level`.
pub fn init_tracing(json: bool, level: &str, logging: &helmcoil_config::Logging) -> eyre::Result<()> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        layers.push(console.json().boxed());
    } else {
        layers.push(console.boxed());
    }

    if let Some(file) = logging.file.as_deref().filter(|f| !f.is_empty()) {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
        let appender = RollingFileAppender::new(rotation(logging.rotation.as_deref())?, dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| eyre::eyre!("invalid log level {level:?}: {e}"))?;

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| eyre::eyre!("tracing init failed: {e}"))
}
