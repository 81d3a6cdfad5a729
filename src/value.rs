// Loggable values accepted by the per-severity logger
// Used both for call arguments and for values stored in a request context

use serde::Serialize;
use std::fmt::{self, Write};

/// A single loggable value.
///
/// Serializes untagged, so `LogValue::Int(42)` becomes `42` in a record and
/// `LogValue::Json(..)` is embedded as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Json(serde_json::Value),
}

impl LogValue {
    pub fn is_str(&self) -> bool {
        matches!(self, LogValue::Str(_))
    }
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Str(s) => f.write_str(s),
            LogValue::Int(n) => write!(f, "{n}"),
            LogValue::UInt(n) => write!(f, "{n}"),
            LogValue::Float(n) => write!(f, "{n}"),
            LogValue::Bool(b) => write!(f, "{b}"),
            LogValue::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        LogValue::Str(value.to_owned())
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        LogValue::Str(value)
    }
}

impl From<&String> for LogValue {
    fn from(value: &String) -> Self {
        LogValue::Str(value.clone())
    }
}

impl From<bool> for LogValue {
    fn from(value: bool) -> Self {
        LogValue::Bool(value)
    }
}

impl From<serde_json::Value> for LogValue {
    fn from(value: serde_json::Value) -> Self {
        LogValue::Json(value)
    }
}

macro_rules! impl_from_number {
    ($variant:ident as $target:ty: $($source:ty),*) => {
        $(
            impl From<$source> for LogValue {
                fn from(value: $source) -> Self {
                    LogValue::$variant(value as $target)
                }
            }
        )*
    };
}

impl_from_number!(Int as i64: i8, i16, i32, i64, isize);
impl_from_number!(UInt as u64: u8, u16, u32, u64, usize);
impl_from_number!(Float as f64: f32, f64);

/// Render call arguments into a single message.
///
/// A space separates two adjacent operands only when neither of them is a
/// string, so `["user ", 42]` renders as `user 42` and `[1, 2]` as `1 2`.
pub fn render_message(args: &[LogValue]) -> String {
    let mut message = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !arg.is_str() && !args[i - 1].is_str() {
            message.push(' ');
        }
        let _ = write!(message, "{arg}");
    }
    message
}
