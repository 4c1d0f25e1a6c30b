//! In-memory event recorder for log assertions
//!
//! Experiment tasks log from their own threads, so the recorder is
//! installed as the global subscriber and shared by every test in the
//! binary. Each event remembers the `run_id` of the experiment span it was
//! emitted under; filter by run (or by a task name unique to the test) to
//! stay clear of concurrently running tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::core_types::schema::{FIELD_EVENT, FIELD_OP, FIELD_RUN_ID, FIELD_TASK};

/// One recorded event
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    /// `run_id` of the innermost enclosing span that carries one
    pub run_id: Option<String>,
    fields: BTreeMap<&'static str, String>,
}

impl CapturedEvent {
    /// A field rendered as text; string values are stored unquoted
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(FIELD_OP)
    }

    pub fn event(&self) -> Option<&str> {
        self.field(FIELD_EVENT)
    }

    pub fn task(&self) -> Option<&str> {
        self.field(FIELD_TASK)
    }

    /// Rendered message, e.g. `[john]: start update`
    pub fn message(&self) -> Option<&str> {
        self.field("message")
    }
}

#[derive(Default)]
struct FieldMap(BTreeMap<&'static str, String>);

impl Visit for FieldMap {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name(), format!("{:?}", value));
    }
}

/// Span extension holding the span's own `run_id`
struct SpanRunId(String);

type Buffer = Arc<Mutex<Vec<CapturedEvent>>>;

/// Layer that appends every event to a shared buffer
pub struct TestCaptureLayer {
    buffer: Buffer,
}

impl TestCaptureLayer {
    pub fn new() -> (Self, TestCapture) {
        let buffer = Buffer::default();
        (
            Self {
                buffer: Arc::clone(&buffer),
            },
            TestCapture { buffer },
        )
    }
}

impl<S> Layer<S> for TestCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = FieldMap::default();
        attrs.record(&mut fields);
        if let (Some(run_id), Some(span)) = (fields.0.remove(FIELD_RUN_ID), ctx.span(id)) {
            span.extensions_mut().insert(SpanRunId(run_id));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = FieldMap::default();
        event.record(&mut fields);

        let run_id = ctx.event_scope(event).and_then(|mut scope| {
            scope.find_map(|span| {
                let extensions = span.extensions();
                extensions.get::<SpanRunId>().map(|r| r.0.clone())
            })
        });

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            run_id,
            fields: fields.0,
        };
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push(captured);
        }
    }
}

/// Read side of the recorder
#[derive(Clone)]
pub struct TestCapture {
    buffer: Buffer,
}

impl TestCapture {
    /// Snapshot of everything recorded so far, in emission order
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.buffer.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Events emitted under one experiment run
    pub fn run_events(&self, run_id: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.run_id.as_deref() == Some(run_id))
    }

    /// Events tagged with one task name
    pub fn task_events(&self, task: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.task() == Some(task))
    }

    /// Rendered `[<task>]: ...` lines of one task
    pub fn task_messages(&self, task: &str) -> Vec<String> {
        self.task_events(task)
            .iter()
            .filter_map(|e| e.message().map(str::to_string))
            .collect()
    }

    pub fn matching<F>(&self, predicate: F) -> Vec<CapturedEvent>
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().into_iter().filter(|e| predicate(e)).collect()
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.matching(predicate).len()
    }

    /// # Panics
    ///
    /// Panics if no event has this `op` and `event`
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let found = self.count_events(|e| e.op() == Some(op) && e.event() == Some(event));
        assert!(found > 0, "no event op={} event={} was recorded", op, event);
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the recorder (first call only) and return its handle
///
/// # Example
///
/// ```
/// use rowlock_core::logging_facility::test_capture::init_test_capture;
/// use rowlock_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("setup");
/// capture.assert_event_exists("setup", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (layer, capture) = TestCaptureLayer::new();
            // Another subscriber may already be global; events then go there
            let _ = tracing_subscriber::registry().with(layer).try_init();
            capture
        })
        .clone()
}
