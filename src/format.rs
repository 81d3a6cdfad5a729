// JSON record formatter for severity sinks
// One line per event: timestamp, level, msg, then any context fields

use serde_json::{Map, Value};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Event field carrying the serialized context fields of a record.
/// Must match the field name `Sink::emit` records.
pub(crate) const CONTEXT_FIELD: &str = "context";

const MESSAGE_FIELD: &str = "message";

const RESERVED_KEYS: [&str; 3] = ["timestamp", "level", "msg"];

#[derive(Debug, Default)]
pub struct RecordFormat {
    timer: SystemTime,
}

impl<S, N> FormatEvent<S, N> for RecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut timestamp = String::new();
        self.timer.format_time(&mut Writer::new(&mut timestamp))?;

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let record = build_record(timestamp, event.metadata().level(), visitor);
        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

/// Collects the message and serialized context of an event.
#[derive(Debug, Default)]
struct RecordVisitor {
    message: Option<String>,
    context: Option<String>,
}

impl RecordVisitor {
    fn record_value(&mut self, field: &Field, value: String) {
        match field.name() {
            MESSAGE_FIELD => self.message = Some(value),
            CONTEXT_FIELD => self.context = Some(value),
            _ => {}
        }
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{value:?}"));
    }
}

fn build_record(timestamp: String, level: &Level, visitor: RecordVisitor) -> Map<String, Value> {
    let mut record = Map::new();

    let context = visitor.context.as_deref().filter(|c| !c.is_empty());
    if let Some(Ok(Value::Object(fields))) = context.map(serde_json::from_str::<Value>) {
        for (key, value) in fields {
            // Context keys never shadow the record's own keys.
            let key = if RESERVED_KEYS.contains(&key.as_str()) {
                format!("fields.{key}")
            } else {
                key
            };
            record.insert(key, value);
        }
    }

    record.insert("timestamp".to_owned(), Value::String(timestamp));
    record.insert(
        "level".to_owned(),
        Value::String(level.to_string().to_ascii_lowercase()),
    );
    record.insert(
        "msg".to_owned(),
        Value::String(visitor.message.unwrap_or_default()),
    );
    record
}
