// Library exports for sevlog
// Per-severity structured request logging on top of tracing

pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod logger;
pub mod server;
pub mod severity;
pub mod sink;
pub mod value;

pub use config::LoggerConfig;
pub use context::{extract_fields, ContextField, ContextStore, RequestContext};
pub use error::StartupError;
pub use logger::{configure, Logger, LoggerFactory};
pub use severity::Severity;
pub use value::LogValue;
