// Structured logging module using tracing
// Per-severity request logger plus the process-wide diagnostics subscriber

use crate::config::{AppConfig, LogFormat, LogLevel, LoggerConfig};
use crate::context::{extract_fields, ContextField, ContextStore};
use crate::error::StartupError;
use crate::severity::Severity;
use crate::sink::{stdout_console, ConsoleWriter, Sink, SinkRegistry};
use crate::value::{render_message, LogValue};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Initialize the diagnostics subscriber for the process itself
pub fn init(config: &AppConfig) -> Result<()> {
    let log_level = match config.log_level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

/// Capture the logger configuration; nothing touches the filesystem until
/// [`LoggerFactory::build`].
///
/// ```no_run
/// use sevlog::{configure, LoggerConfig, RequestContext};
///
/// let config = LoggerConfig::new("DEV", "/tmp/logs");
/// let logger = configure(config, ["X-Request-Id", "X-User-Id"]).build()?;
///
/// let ctx = RequestContext::new().with("X-Request-Id", "42");
/// sevlog::log_info!(logger, Some(&ctx), "user logged in");
/// # Ok::<(), sevlog::StartupError>(())
/// ```
pub fn configure<I, F>(config: LoggerConfig, fields: I) -> LoggerFactory
where
    I: IntoIterator<Item = F>,
    F: Into<ContextField>,
{
    LoggerFactory {
        config,
        fields: fields.into_iter().map(Into::into).collect(),
        console: stdout_console(),
    }
}

pub struct LoggerFactory {
    config: LoggerConfig,
    fields: Vec<ContextField>,
    console: ConsoleWriter,
}

impl LoggerFactory {
    /// Replace stdout as the duplicate stream used outside PROD and STAGE.
    pub fn with_console<M>(mut self, console: M) -> Self
    where
        M: for<'a> MakeWriter<'a> + Clone + Send + Sync + 'static,
    {
        self.console = Arc::new(move || BoxMakeWriter::new(console.clone()));
        self
    }

    /// Create the log directory if needed and open all four sinks.
    ///
    /// Either every sink opens or an error is returned; a partially
    /// configured logger is never produced.
    pub fn build(self) -> Result<Logger, StartupError> {
        let LoggerFactory {
            config,
            fields,
            console,
        } = self;

        ensure_log_dir(&config.log_dir)?;

        let duplicate = !config.is_production_like();
        let sinks = SinkRegistry::open(&config.log_dir, duplicate.then_some(&console))?;

        tracing::debug!(
            log_dir = %config.log_dir.display(),
            environment = %config.environment,
            console = duplicate,
            fields = ?fields,
            "Severity sinks opened"
        );

        Ok(Logger { sinks, fields })
    }
}

fn ensure_log_dir(dir: &Path) -> Result<(), StartupError> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder
        .create(dir)
        .map_err(|source| StartupError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}

/// Per-severity request logger.
///
/// Sinks and context field names are fixed once built. Share it between
/// request handlers behind an `Arc`; dropping the last handle closes the
/// log files.
pub struct Logger {
    sinks: SinkRegistry,
    fields: Vec<ContextField>,
}

impl Logger {
    pub fn debug(&self, ctx: Option<&dyn ContextStore>, args: &[LogValue]) {
        self.log(Severity::Debug, ctx, args);
    }

    pub fn info(&self, ctx: Option<&dyn ContextStore>, args: &[LogValue]) {
        self.log(Severity::Info, ctx, args);
    }

    pub fn warning(&self, ctx: Option<&dyn ContextStore>, args: &[LogValue]) {
        self.log(Severity::Warn, ctx, args);
    }

    pub fn error(&self, ctx: Option<&dyn ContextStore>, args: &[LogValue]) {
        self.log(Severity::Error, ctx, args);
    }

    /// Write one record to the sink for `severity`, at that severity's level.
    pub fn log(&self, severity: Severity, ctx: Option<&dyn ContextStore>, args: &[LogValue]) {
        let context = match ctx {
            Some(ctx) => {
                let fields = extract_fields(ctx, &self.fields);
                if fields.is_empty() {
                    String::new()
                } else {
                    serde_json::to_string(&fields).unwrap_or_default()
                }
            }
            None => String::new(),
        };

        self.sinks
            .get(severity)
            .emit(severity, &render_message(args), &context);
    }

    pub fn sink(&self, severity: Severity) -> &Sink {
        self.sinks.get(severity)
    }

    pub fn context_fields(&self) -> &[ContextField] {
        &self.fields
    }
}

/// `log_debug!(logger, ctx, args...)`, converting each arg with `LogValue::from`.
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $ctx:expr $(, $arg:expr)* $(,)?) => {
        $logger.debug($ctx, &[$($crate::LogValue::from($arg)),*])
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $ctx:expr $(, $arg:expr)* $(,)?) => {
        $logger.info($ctx, &[$($crate::LogValue::from($arg)),*])
    };
}

#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $ctx:expr $(, $arg:expr)* $(,)?) => {
        $logger.warning($ctx, &[$($crate::LogValue::from($arg)),*])
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $ctx:expr $(, $arg:expr)* $(,)?) => {
        $logger.error($ctx, &[$($crate::LogValue::from($arg)),*])
    };
}
