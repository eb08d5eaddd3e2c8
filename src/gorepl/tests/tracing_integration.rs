mod common;

use common::{FakeGo, answer, fake_builder};
use std::sync::{Arc, Mutex};
use tracing::Dispatch;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Clone)]
struct TestTracingLayer {
    spans: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> tracing_subscriber::Layer<S> for TestTracingLayer
where
    S: tracing::Subscriber,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor {
            message: attrs.metadata().name().to_string(),
        };
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(visitor.message);
    }

    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);
        self.events.lock().unwrap().push(visitor.message);
    }
}

struct FieldVisitor {
    message: String,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if !self.message.is_empty() {
            self.message.push_str(", ");
        }
        self.message
            .push_str(&format!("{}={:?}", field.name(), value));
    }
}

fn recording() -> (Dispatch, Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>) {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = TestTracingLayer {
        spans: spans.clone(),
        events: events.clone(),
    };
    let dispatch = Dispatch::new(tracing_subscriber::registry().with(layer));
    (dispatch, spans, events)
}

#[test]
fn test_session_logs_to_injected_dispatch() {
    let (dispatch, spans, events) = recording();

    let mut session = fake_builder(FakeGo::new(|source| answer(source, "3\n")))
        .dispatch(dispatch)
        .build()
        .unwrap();
    session.eval("1 + 2").unwrap();
    session.close().unwrap();

    let recorded_spans = spans.lock().unwrap();
    let recorded_events = events.lock().unwrap();

    assert!(recorded_spans.iter().any(|s| s.starts_with("eval") && s.contains("lines=1")));
    assert!(recorded_events.iter().any(|e| e.contains("session started")));
    assert!(recorded_events.iter().any(|e| e.contains("committed")));
    assert!(recorded_events.iter().any(|e| e.contains("closing session")));
}

#[test]
fn test_rollback_is_logged() {
    let (dispatch, _spans, events) = recording();

    let mut session = fake_builder(FakeGo::new(|_| gorepl::runner::RunResult {
        stdout: Vec::new(),
        stderr: b"./gorepl_session.go:9:2: undefined: y\n".to_vec(),
        exit_code: Some(1),
    }))
    .dispatch(dispatch)
    .build()
    .unwrap();
    assert!(session.eval("y").is_err());

    let recorded_events = events.lock().unwrap();
    assert!(recorded_events.iter().any(|e| e.contains("rolling back")));
}

#[test]
fn test_sessions_do_not_share_logs() {
    let (first, _, first_events) = recording();
    let (second, _, second_events) = recording();

    let mut a = fake_builder(FakeGo::new(|source| answer(source, "1\n")))
        .dispatch(first)
        .build()
        .unwrap();
    let _b = fake_builder(FakeGo::new(|source| answer(source, "2\n")))
        .dispatch(second)
        .build()
        .unwrap();
    a.eval("1").unwrap();

    assert!(first_events.lock().unwrap().iter().any(|e| e.contains("committed")));
    assert!(!second_events.lock().unwrap().iter().any(|e| e.contains("committed")));
}
