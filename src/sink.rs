// Severity sinks and their registry
// Each sink is an isolated tracing dispatcher writing JSON records to its own file

use crate::error::StartupError;
use crate::format::RecordFormat;
use crate::severity::Severity;
use std::path::Path;
use std::sync::Arc;
use tracing::{Dispatch, Level};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// Target of every record event, kept apart from process diagnostics.
pub const RECORD_TARGET: &str = "sevlog::record";

/// Produces a fresh console writer for each sink that duplicates output.
pub type ConsoleWriter = Arc<dyn Fn() -> BoxMakeWriter + Send + Sync>;

pub fn stdout_console() -> ConsoleWriter {
    Arc::new(|| BoxMakeWriter::new(std::io::stdout))
}

pub struct Sink {
    severity: Severity,
    dispatch: Dispatch,
}

impl Sink {
    /// Open `<dir>/<Severity>.log` for appending, teeing to `console` if given.
    pub fn open(
        severity: Severity,
        dir: &Path,
        console: Option<&ConsoleWriter>,
    ) -> Result<Self, StartupError> {
        let file = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(severity.name())
            .filename_suffix("log")
            .build(dir)
            .map_err(|source| StartupError::OpenFile {
                path: dir.join(severity.file_name()),
                source,
            })?;

        let writer = match console {
            Some(console) => BoxMakeWriter::new(file.and(console())),
            None => BoxMakeWriter::new(file),
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(severity.level())
            .with_ansi(false)
            .event_format(RecordFormat::default())
            .with_writer(writer)
            .finish();

        Ok(Sink {
            severity,
            dispatch: Dispatch::new(subscriber),
        })
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Write one record at `level`. `context` is a serialized JSON object or empty.
    ///
    /// Events below the sink's own severity are discarded by its level filter.
    pub fn emit(&self, level: Severity, message: &str, context: &str) {
        tracing::dispatcher::with_default(&self.dispatch, || match level {
            Severity::Debug => {
                tracing::event!(target: RECORD_TARGET, Level::DEBUG, context = context, "{message}")
            }
            Severity::Info => {
                tracing::event!(target: RECORD_TARGET, Level::INFO, context = context, "{message}")
            }
            Severity::Warn => {
                tracing::event!(target: RECORD_TARGET, Level::WARN, context = context, "{message}")
            }
            Severity::Error => {
                tracing::event!(target: RECORD_TARGET, Level::ERROR, context = context, "{message}")
            }
        });
    }
}

/// Exactly one sink per severity, fixed at construction.
pub struct SinkRegistry {
    debug: Sink,
    info: Sink,
    warn: Sink,
    error: Sink,
}

impl SinkRegistry {
    pub fn open(dir: &Path, console: Option<&ConsoleWriter>) -> Result<Self, StartupError> {
        Ok(SinkRegistry {
            debug: Sink::open(Severity::Debug, dir, console)?,
            info: Sink::open(Severity::Info, dir, console)?,
            warn: Sink::open(Severity::Warn, dir, console)?,
            error: Sink::open(Severity::Error, dir, console)?,
        })
    }

    pub fn get(&self, severity: Severity) -> &Sink {
        match severity {
            Severity::Debug => &self.debug,
            Severity::Info => &self.info,
            Severity::Warn => &self.warn,
            Severity::Error => &self.error,
        }
    }
}
