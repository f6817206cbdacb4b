//! In-memory event capture for logging assertions
//!
//! The subscriber is process-wide and installed on first use: all tests in
//! one binary append to the same list. Look events up by `op` and phase,
//! never by position in the whole list.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::studyhub_core_types::schema;

/// A recorded event; field values are kept in their display form
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(schema::FIELD_OP)
    }

    /// `start`, `end` or `end_error` for boundary events
    pub fn phase(&self) -> Option<&str> {
        self.field(schema::FIELD_EVENT)
    }

    /// Whether any field value contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.fields.values().any(|v| v.contains(needle))
    }
}

struct Recorder<'a>(&'a mut BTreeMap<String, String>);

impl Visit for Recorder<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    // Numbers and bools print the same through Debug
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{:?}", value));
    }
}

type Sink = Arc<Mutex<Vec<CapturedEvent>>>;

struct CaptureLayer(Sink);

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut Recorder(&mut fields));
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            fields,
        };
        if let Ok(mut events) = self.0.lock() {
            events.push(captured);
        }
    }
}

#[derive(Clone)]
pub struct TestCapture(Sink);

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events of one operation, in emission order
    pub fn events_for(&self, op: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.op() == Some(op))
            .collect()
    }

    /// Events of one operation in one phase
    pub fn phase_of(&self, op: &str, phase: &str) -> Vec<CapturedEvent> {
        self.events_for(op)
            .into_iter()
            .filter(|e| e.phase() == Some(phase))
            .collect()
    }

    /// # Panics
    ///
    /// Panics unless `op` logged exactly one event in `phase`.
    pub fn single(&self, op: &str, phase: &str) -> CapturedEvent {
        let mut found = self.phase_of(op, phase);
        assert_eq!(
            found.len(),
            1,
            "expected one {} event for {}, got {}",
            phase,
            op,
            found.len()
        );
        found.remove(0)
    }
}

static CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install (once) and return the shared capture
///
/// ```
/// use studyhub_core::log_op_start;
/// use studyhub_core::logging_facility::init_test_capture;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_get_mains");
/// assert_eq!(capture.single("doc_get_mains", "start").op(), Some("doc_get_mains"));
/// ```
pub fn init_test_capture() -> TestCapture {
    CAPTURE
        .get_or_init(|| {
            let sink = Sink::default();
            tracing_subscriber::registry()
                .with(CaptureLayer(sink.clone()))
                .init();
            TestCapture(sink)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end_event(result_len: &str) -> CapturedEvent {
        let fields = [
            (schema::FIELD_OP, "get_mains"),
            (schema::FIELD_EVENT, schema::EVENT_END),
            ("result_len", result_len),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        CapturedEvent {
            level: Level::INFO,
            fields,
        }
    }

    #[test]
    fn test_accessors_read_schema_fields() {
        let event = end_event("3");

        assert_eq!(event.op(), Some("get_mains"));
        assert_eq!(event.phase(), Some(schema::EVENT_END));
        assert_eq!(event.field("result_len"), Some("3"));
        assert_eq!(event.field("missing"), None);
    }

    #[test]
    fn test_mentions_scans_values_only() {
        let event = end_event("12");

        assert!(event.mentions("get_"));
        assert!(!event.mentions("result_len"));
    }
}
