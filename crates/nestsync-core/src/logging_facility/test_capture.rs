//! In-memory log capture for tests
//!
//! [`init_test_capture`] installs one global subscriber per test binary and
//! records the fields of every event. Tests in a binary run in parallel against
//! the same capture, so queries filter on the operation name and on field
//! values a test can expect to be its own.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::nestsync_core_types::schema::EVENT_END;

/// One recorded event, with every field rendered as a string
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub op: Option<String>,
    pub event: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Numeric field such as `created` or `duration_ms`
    pub fn count(&self, name: &str) -> Option<u64> {
        self.field(name).and_then(|v| v.parse().ok())
    }

    pub fn is(&self, op: &str, event: &str) -> bool {
        self.op.as_deref() == Some(op) && self.event.as_deref() == Some(event)
    }
}

/// Counts carried by one successful `reconcile` end event
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileCounts {
    pub association: String,
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub skipped_blank: u64,
}

struct FieldRecorder(BTreeMap<String, String>);

impl Visit for FieldRecorder {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

type Sink = Arc<Mutex<Vec<CapturedEvent>>>;

struct CaptureLayer {
    sink: Sink,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorder = FieldRecorder(BTreeMap::new());
        event.record(&mut recorder);
        let fields = recorder.0;

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            op: fields.get("op").cloned(),
            event: fields.get("event").cloned(),
            fields,
        };
        if let Ok(mut events) = self.sink.lock() {
            events.push(captured);
        }
    }
}

/// Query handle over everything captured so far
#[derive(Clone)]
pub struct TestCapture {
    sink: Sink,
}

impl TestCapture {
    fn snapshot(&self) -> Vec<CapturedEvent> {
        self.sink.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events for one operation, in emission order
    pub fn events_for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.snapshot()
            .into_iter()
            .filter(|e| e.op.as_deref() == Some(op))
            .collect()
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.snapshot().iter().filter(|e| predicate(e)).count()
    }

    /// # Panics
    ///
    /// Panics if no event matches `op` and `event`
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let events = self.snapshot();
        assert!(
            events.iter().any(|e| e.is(op, event)),
            "no op={} event={} among {} captured events",
            op,
            event,
            events.len()
        );
    }

    /// Counts of every successful reconciliation of `association`
    pub fn reconcile_counts(&self, association: &str) -> Vec<ReconcileCounts> {
        self.events_for_op("reconcile")
            .into_iter()
            .filter(|e| e.is("reconcile", EVENT_END) && e.field("association") == Some(association))
            .map(|e| ReconcileCounts {
                association: association.to_string(),
                created: e.count("created").unwrap_or_default(),
                updated: e.count("updated").unwrap_or_default(),
                deleted: e.count("deleted").unwrap_or_default(),
                skipped_blank: e.count("skipped_blank").unwrap_or_default(),
            })
            .collect()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture subscriber on first use and return a handle to it
///
/// ```
/// use nestsync_core::log_op_start;
/// use nestsync_core::logging_facility::test_capture::init_test_capture;
///
/// let capture = init_test_capture();
/// log_op_start!("declare_nested");
/// capture.assert_event_exists("declare_nested", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let sink = Sink::default();
            tracing_subscriber::registry()
                .with(CaptureLayer { sink: sink.clone() })
                .init();
            TestCapture { sink }
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end_event(fields: &[(&str, &str)]) -> CapturedEvent {
        let fields: BTreeMap<String, String> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CapturedEvent {
            level: Level::INFO,
            op: fields.get("op").cloned(),
            event: fields.get("event").cloned(),
            fields,
        }
    }

    #[test]
    fn test_count_parses_numeric_fields() {
        let event = end_event(&[
            ("op", "reconcile"),
            ("event", "end"),
            ("created", "2"),
            ("parent_id", "abc"),
        ]);

        assert!(event.is("reconcile", "end"));
        assert_eq!(event.count("created"), Some(2));
        assert_eq!(event.count("parent_id"), None);
        assert_eq!(event.count("deleted"), None);
    }

    #[test]
    fn test_reconcile_counts_reads_end_events_only() {
        let sink = Sink::default();
        let capture = TestCapture { sink: sink.clone() };
        {
            let mut events = sink.lock().unwrap();
            events.push(end_event(&[
                ("op", "reconcile"),
                ("event", "start"),
                ("association", "tasks"),
            ]));
            events.push(end_event(&[
                ("op", "reconcile"),
                ("event", "end"),
                ("association", "tasks"),
                ("created", "1"),
                ("updated", "2"),
                ("deleted", "0"),
                ("skipped_blank", "3"),
            ]));
            events.push(end_event(&[
                ("op", "reconcile"),
                ("event", "end"),
                ("association", "notes"),
                ("created", "5"),
            ]));
        }

        assert_eq!(
            capture.reconcile_counts("tasks"),
            vec![ReconcileCounts {
                association: "tasks".to_string(),
                created: 1,
                updated: 2,
                deleted: 0,
                skipped_blank: 3,
            }]
        );
    }
}
