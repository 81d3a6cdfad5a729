// Configuration module for the sevlog request logger and its demo server
// Precedence: CLI > file > env > defaults

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environments that write to the log files only, without console duplication.
pub const PRODUCTION_ENVIRONMENTS: [&str; 2] = ["PROD", "STAGE"];

/// Settings consumed by the per-severity logger factory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggerConfig {
    pub environment: String,
    pub log_dir: PathBuf,
}

impl LoggerConfig {
    pub fn new(environment: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        LoggerConfig {
            environment: environment.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Case-sensitive: only "PROD" and "STAGE" count, not "prod".
    pub fn is_production_like(&self) -> bool {
        PRODUCTION_ENVIRONMENTS.contains(&self.environment.as_str())
    }
}

// Level of the process diagnostics subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default = "default_bind_address")]
    pub server_bind_address: String,

    #[serde(default)]
    pub environment: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_context_fields")]
    pub context_fields: Vec<String>,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_server_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_context_fields() -> Vec<String> {
    vec!["X-Request-Id".to_string()]
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server_port: default_server_port(),
            server_bind_address: default_bind_address(),
            environment: String::new(),
            log_dir: default_log_dir(),
            context_fields: default_context_fields(),
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "sevlog")]
#[command(about = "HTTP server logging every request to per-severity files", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (TOML format)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// TCP port for the HTTP server
    #[arg(long)]
    pub server_port: Option<u16>,

    /// Bind address for the HTTP server
    #[arg(long)]
    pub server_bind: Option<String>,

    /// Deployment environment (PROD and STAGE disable console duplication)
    #[arg(long)]
    pub env: Option<String>,

    /// Directory holding Debug.log, Info.log, Warn.log and Error.log
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Request context keys attached to every record (repeatable)
    #[arg(long = "context-field")]
    pub context_fields: Vec<String>,

    /// Diagnostics log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Diagnostics log format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            anyhow::bail!("server_port must be between 1 and 65535");
        }

        if self.log_dir.as_os_str().is_empty() {
            anyhow::bail!("log_dir must not be empty");
        }

        if let Some(field) = self.context_fields.iter().find(|f| f.trim().is_empty()) {
            anyhow::bail!("context_fields must not contain blank names (got {:?})", field);
        }

        Ok(())
    }

    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig::new(self.environment.clone(), self.log_dir.clone())
    }

    pub fn load() -> Result<Self> {
        Self::load_from_args(CliArgs::parse())
    }

    pub fn load_from_args(cli_args: CliArgs) -> Result<Self> {
        let mut config = AppConfig::default();

        if cli_args.config.is_none() {
            config = Self::load_from_env(config)?;
        }

        if let Some(config_path) = &cli_args.config {
            config = Self::load_from_file(config_path)?;
        }

        config = Self::apply_cli_overrides(config, cli_args);

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    fn load_from_env(mut config: AppConfig) -> Result<Self> {
        if let Ok(port) = std::env::var("SEVLOG_SERVER_PORT") {
            config.server_port = port.parse().context("Invalid SEVLOG_SERVER_PORT")?;
        }

        if let Ok(bind) = std::env::var("SEVLOG_SERVER_BIND") {
            config.server_bind_address = bind;
        }

        if let Ok(env) = std::env::var("SEVLOG_ENV") {
            config.environment = env;
        }

        if let Ok(dir) = std::env::var("SEVLOG_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        if let Ok(fields) = std::env::var("SEVLOG_CONTEXT_FIELDS") {
            config.context_fields = parse_field_list(&fields);
        }

        if let Ok(level) = std::env::var("SEVLOG_LOG_LEVEL") {
            config.log_level = match level.to_lowercase().as_str() {
                "trace" => LogLevel::Trace,
                "debug" => LogLevel::Debug,
                "info" => LogLevel::Info,
                "warn" => LogLevel::Warn,
                "error" => LogLevel::Error,
                _ => anyhow::bail!("Invalid log level: {}", level),
            };
        }

        if let Ok(format) = std::env::var("SEVLOG_LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => anyhow::bail!("Invalid log format: {}", format),
            };
        }

        Ok(config)
    }

    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    fn apply_cli_overrides(mut config: AppConfig, cli: CliArgs) -> Self {
        if let Some(port) = cli.server_port {
            config.server_port = port;
        }

        if let Some(bind) = cli.server_bind {
            config.server_bind_address = bind;
        }

        if let Some(env) = cli.env {
            config.environment = env;
        }

        if let Some(dir) = cli.log_dir {
            config.log_dir = dir;
        }

        if !cli.context_fields.is_empty() {
            config.context_fields = cli.context_fields;
        }

        if let Some(level) = cli.log_level {
            config.log_level = level;
        }

        if let Some(format) = cli.log_format {
            config.log_format = format;
        }

        config
    }
}

/// Split a comma-separated list of context field names, dropping blanks.
pub fn parse_field_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}
