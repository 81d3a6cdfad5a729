// Integration tests for the per-severity logger
// These tests verify file layout, console duplication, context fields and record format

use serde_json::Value;
use sevlog::{
    configure, log_debug, log_error, log_info, log_warning, LogValue, Logger, LoggerConfig,
    RequestContext, Severity, StartupError,
};
use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

/// In-memory console stream shared by every sink of a logger
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn records(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        parse_records(&String::from_utf8(bytes).unwrap())
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn parse_records(content: &str) -> Vec<Value> {
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is a JSON record"))
        .collect()
}

fn read_records(dir: &Path, severity: Severity) -> Vec<Value> {
    let content = std::fs::read_to_string(dir.join(severity.file_name())).unwrap();
    parse_records(&content)
}

fn build_logger(environment: &str, dir: &Path, fields: &[&str]) -> (Logger, Capture) {
    let console = Capture::default();
    let logger = configure(LoggerConfig::new(environment, dir), fields.iter().copied())
        .with_console(console.clone())
        .build()
        .expect("logger builds");
    (logger, console)
}

fn keys(record: &Value) -> BTreeSet<String> {
    record.as_object().unwrap().keys().cloned().collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_build_creates_one_file_per_severity() {
    let tmp = TempDir::new().unwrap();
    let (_logger, _) = build_logger("DEV", tmp.path(), &[]);

    for name in ["Debug.log", "Info.log", "Warn.log", "Error.log"] {
        assert!(tmp.path().join(name).is_file(), "{name} should exist");
    }
}

#[test]
fn test_build_creates_missing_log_dir() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("logs");
    let (logger, _) = build_logger("PROD", &dir, &[]);

    log_info!(logger, None, "hello");

    assert!(dir.is_dir());
    assert_eq!(read_records(&dir, Severity::Info).len(), 1);
}

#[test]
fn test_build_fails_when_log_dir_cannot_be_created() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("missing").join("logs");

    let result = configure(LoggerConfig::new("PROD", &dir), ["X-Request-Id"]).build();

    match result {
        Err(StartupError::CreateDir { path, .. }) => assert_eq!(path, dir),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("build should fail without a parent directory"),
    }
}

#[test]
fn test_build_fails_when_log_file_cannot_be_opened() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("Info.log")).unwrap();

    let result = configure(LoggerConfig::new("PROD", tmp.path()), Vec::<String>::new()).build();

    match result {
        Err(err @ StartupError::OpenFile { .. }) => {
            assert!(err.to_string().contains("Info.log"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("build should fail when Info.log is a directory"),
    }
}

#[test]
fn test_production_environments_write_file_only() {
    for environment in ["PROD", "STAGE"] {
        let tmp = TempDir::new().unwrap();
        let (logger, console) = build_logger(environment, tmp.path(), &[]);

        log_info!(logger, None, "file only");

        assert_eq!(read_records(tmp.path(), Severity::Info).len(), 1);
        assert!(
            console.records().is_empty(),
            "{environment} must not write to the console"
        );
    }
}

#[test]
fn test_other_environments_duplicate_to_console() {
    for environment in ["DEV", "", "prod", "Stage", "QA"] {
        let tmp = TempDir::new().unwrap();
        let (logger, console) = build_logger(environment, tmp.path(), &[]);

        log_warning!(logger, None, "duplicated");

        let file = read_records(tmp.path(), Severity::Warn);
        let echoed = console.records();
        assert_eq!(file.len(), 1);
        assert_eq!(echoed.len(), 1, "{environment:?} should duplicate to console");
        assert_eq!(file[0], echoed[0]);
    }
}

#[test]
fn test_context_fields_subset_for_every_severity() {
    let tmp = TempDir::new().unwrap();
    let (logger, _) = build_logger(
        "PROD",
        tmp.path(),
        &["X-Request-Id", "X-User-Id", "X-Tenant-Id"],
    );
    let ctx = RequestContext::new()
        .with("X-Request-Id", "req-1")
        .with("X-User-Id", 77u64)
        .with("X-Unconfigured", "ignored");

    for severity in Severity::ALL {
        logger.log(severity, Some(&ctx), &["payload".into()]);

        let records = read_records(tmp.path(), severity);
        assert_eq!(records.len(), 1, "{severity} should have one record");
        let record = &records[0];
        assert_eq!(
            keys(record),
            set(&["timestamp", "level", "msg", "x-request-id", "x-user-id"])
        );
        assert_eq!(record["x-request-id"], "req-1");
        assert_eq!(record["x-user-id"], 77);
        assert_eq!(record["msg"], "payload");
    }
}

#[test]
fn test_no_context_record_has_only_message() {
    let tmp = TempDir::new().unwrap();
    let (logger, _) = build_logger("PROD", tmp.path(), &["X-Request-Id"]);

    log_error!(logger, None, "no context");

    let records = read_records(tmp.path(), Severity::Error);
    assert_eq!(keys(&records[0]), set(&["timestamp", "level", "msg"]));
    assert_eq!(records[0]["msg"], "no context");
}

#[test]
fn test_context_without_configured_fields_adds_nothing() {
    let tmp = TempDir::new().unwrap();
    let (logger, _) = build_logger("PROD", tmp.path(), &["X-Request-Id"]);
    let ctx = RequestContext::new();

    log_debug!(logger, Some(&ctx), "empty context");

    let records = read_records(tmp.path(), Severity::Debug);
    assert_eq!(keys(&records[0]), set(&["timestamp", "level", "msg"]));
}

#[test]
fn test_field_names_are_lowercased() {
    let tmp = TempDir::new().unwrap();
    let (logger, _) = build_logger("PROD", tmp.path(), &["X-Request-Id"]);
    let ctx = RequestContext::new().with("X-Request-Id", "abc");

    log_info!(logger, Some(&ctx), "case");

    let record = &read_records(tmp.path(), Severity::Info)[0];
    assert_eq!(record["x-request-id"], "abc");
    assert!(record.get("X-Request-Id").is_none());
}

#[test]
fn test_end_to_end_dev_info_record() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("logs");
    let (logger, console) = build_logger("DEV", &dir, &["X-Request-Id"]);
    let ctx = RequestContext::new().with("X-Request-Id", 42i64);

    log_info!(logger, Some(&ctx), "user logged in");

    let records = read_records(&dir, Severity::Info);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["level"], "info");
    assert!(record["msg"].as_str().unwrap().contains("user logged in"));
    assert_eq!(record["x-request-id"], 42);
    assert!(record["timestamp"].as_str().is_some_and(|t| !t.is_empty()));

    assert_eq!(console.records(), records);
}

#[test]
fn test_each_severity_routes_to_its_own_file_and_level() {
    let tmp = TempDir::new().unwrap();
    let (logger, _) = build_logger("PROD", tmp.path(), &[]);

    log_debug!(logger, None, "d");
    log_info!(logger, None, "i");
    log_warning!(logger, None, "w");
    log_error!(logger, None, "e");

    for (severity, level, msg) in [
        (Severity::Debug, "debug", "d"),
        (Severity::Info, "info", "i"),
        (Severity::Warn, "warn", "w"),
        (Severity::Error, "error", "e"),
    ] {
        let records = read_records(tmp.path(), severity);
        assert_eq!(records.len(), 1, "{severity} should only get its own record");
        assert_eq!(records[0]["level"], level);
        assert_eq!(records[0]["msg"], msg);
    }
}

// Error records are emitted at error level. Emitting them at warn, as a
// shared warn path would, lands below the Error sink's filter and drops them.
#[test]
fn test_error_sink_drops_warn_level_emission() {
    let tmp = TempDir::new().unwrap();
    let (logger, _) = build_logger("PROD", tmp.path(), &[]);

    logger
        .sink(Severity::Error)
        .emit(Severity::Warn, "routed through warn", "");
    assert!(read_records(tmp.path(), Severity::Error).is_empty());

    logger.error(None, &["routed through error".into()]);
    let records = read_records(tmp.path(), Severity::Error);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["level"], "error");
}

#[test]
fn test_variadic_args_are_joined() {
    let tmp = TempDir::new().unwrap();
    let (logger, _) = build_logger("PROD", tmp.path(), &[]);

    log_info!(logger, None, "user ", 42u32, " active=", true);
    logger.info(None, &[LogValue::from(1i64), LogValue::from(2i64)]);

    let records = read_records(tmp.path(), Severity::Info);
    assert_eq!(records[0]["msg"], "user 42 active=true");
    assert_eq!(records[1]["msg"], "1 2");
}

#[test]
fn test_reopening_appends_to_existing_files() {
    let tmp = TempDir::new().unwrap();

    {
        let (logger, _) = build_logger("PROD", tmp.path(), &[]);
        log_info!(logger, None, "first run");
    }
    {
        let (logger, _) = build_logger("PROD", tmp.path(), &[]);
        log_info!(logger, None, "second run");
    }

    let records = read_records(tmp.path(), Severity::Info);
    let messages: Vec<&str> = records.iter().map(|r| r["msg"].as_str().unwrap()).collect();
    assert_eq!(messages, ["first run", "second run"]);
}

#[test]
fn test_concurrent_writes_produce_whole_records() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 200;

    let tmp = TempDir::new().unwrap();
    let (logger, console) = build_logger("DEV", tmp.path(), &["X-Request-Id"]);
    let logger = Arc::new(logger);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let ctx = RequestContext::new().with("X-Request-Id", format!("{t}-{i}"));
                    log_info!(logger, Some(&ctx), "thread ", t, " record ", i, " ", "x".repeat(256));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let records = read_records(tmp.path(), Severity::Info);
    assert_eq!(records.len(), THREADS * PER_THREAD);
    let ids: BTreeSet<&str> = records
        .iter()
        .map(|r| r["x-request-id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), THREADS * PER_THREAD);
    assert_eq!(console.records().len(), THREADS * PER_THREAD);
}

#[test]
fn test_logger_keeps_configured_fields() {
    let tmp = TempDir::new().unwrap();
    let (logger, _) = build_logger("PROD", tmp.path(), &["X-Request-Id", "X-User-Id"]);

    let names: Vec<&str> = logger.context_fields().iter().map(|f| f.as_str()).collect();
    assert_eq!(names, ["X-Request-Id", "X-User-Id"]);
}
