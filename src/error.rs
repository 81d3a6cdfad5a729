// Startup errors for the per-severity logger
// Any of these means the logger must not be used

use std::path::PathBuf;
use thiserror::Error;
use tracing_appender::rolling::InitError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create log directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open log file {path:?}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: InitError,
    },
}
