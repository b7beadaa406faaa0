use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::Result;

const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "push_deploy";

pub struct FileLogger {
    log_directory: PathBuf,
    rotation: Rotation,
}

impl FileLogger {
    pub fn new(log_directory: impl Into<PathBuf>) -> Self {
        Self {
            log_directory: log_directory.into(),
            rotation: Rotation::DAILY,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn log_directory(&self) -> &Path {
        &self.log_directory
    }

    /// Creates the log directory and a non-blocking rolling file writer.
    /// The guard must be held for as long as logs should be flushed.
    pub fn setup_file_logging(
        &self,
    ) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
        std::fs::create_dir_all(&self.log_directory)?;

        let file_appender =
            RollingFileAppender::new(self.rotation.clone(), &self.log_directory, LOG_FILE_PREFIX);

        Ok(tracing_appender::non_blocking(file_appender))
    }
}

/// Installs the global subscriber: console output always, plus rotated files
/// when a `FileLogger` is given. Filtering follows `RUST_LOG`.
pub fn setup_logging(file_logger: Option<&FileLogger>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, guard) = match file_logger {
        Some(logger) => {
            let (writer, guard) = logger.setup_file_logging()?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false) // Disable ANSI colors for file logs
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer()) // Console output
        .with(file_layer)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logger = FileLogger::new(dir.path().join("logs")).with_rotation(Rotation::NEVER);

        let (_writer, _guard) = logger.setup_file_logging().unwrap();
        assert!(logger.log_directory().is_dir());
    }
}
