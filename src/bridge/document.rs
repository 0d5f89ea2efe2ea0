use serde::Serialize;
use serde_json::{Map, Value};

use crate::event::Event;

/// Field holding the logger name or target.
pub(crate) const MODULE_FIELD: &str = "module";
/// Field holding `file:line` of the call site.
pub(crate) const CALLER_FIELD: &str = "caller";

/// A single log entry as published to CloudLog.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Document {
    pub message: String,
    /// Lowercase level name, e.g. `"warn"`.
    pub level: String,
    /// Logger metadata and structured key/value pairs.
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(message: impl Into<String>, level: impl AsRef<str>) -> Self {
        Self {
            message: message.into(),
            level: level.as_ref().to_ascii_lowercase(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub(crate) fn with_caller(self, file: Option<&str>, line: Option<u32>) -> Self {
        match (file, line) {
            (Some(file), Some(line)) => self.with_field(CALLER_FIELD, format!("{file}:{line}")),
            (Some(file), None) => self.with_field(CALLER_FIELD, file),
            _ => self,
        }
    }
}

impl From<Document> for Event {
    fn from(document: Document) -> Self {
        Event::record(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{AutomaticEncoder, EventEncoder};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn encodes_as_record() {
        let document = Document::new("disk almost full", "WARN").with_field("free_mb", 12);
        let envelope = AutomaticEncoder::new()
            .encode_event(&Event::from(document))
            .expect("documents are records");
        assert_eq!(
            Value::Object(envelope),
            json!({"message": "disk almost full", "level": "warn", "fields": {"free_mb": 12}})
        );
    }

    #[rstest]
    #[case(Some("src/main.rs"), Some(7), Some("src/main.rs:7"))]
    #[case(Some("src/main.rs"), None, Some("src/main.rs"))]
    #[case(None, Some(7), None)]
    fn caller_uses_available_location(
        #[case] file: Option<&str>,
        #[case] line: Option<u32>,
        #[case] expected: Option<&str>,
    ) {
        let document = Document::new("m", "info").with_caller(file, line);
        assert_eq!(
            document.fields.get(CALLER_FIELD).and_then(Value::as_str),
            expected
        );
    }
}
