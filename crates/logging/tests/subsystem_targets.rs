//! Checks that every subsystem macro emits under its own `sitewarden::` target
//! at the documented level, and that verbosity filters select them.

use std::sync::{Arc, Mutex, PoisonError};

use logging::{
    Verbosity, build_filter, trace_batch, trace_inventory, trace_mutation, trace_negotiate,
    trace_pacing, trace_transport, trace_verify,
};
use tracing::Level;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<(String, Level)>>>,
}

impl Recorder {
    fn events(&self) -> Vec<(String, Level)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<S: tracing::Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((metadata.target().to_owned(), *metadata.level()));
    }
}

fn emit_all() {
    trace_transport!(status = 200, "response");
    trace_pacing!(wait_ms = 1200, "holding");
    trace_negotiate!("fallback");
    trace_inventory!(count = 3, "plugins");
    trace_mutation!(operation = "update-plugin", "accepted");
    trace_verify!("verified");
    trace_batch!(items = 2, "sequential");
}

fn capture(verbosity: Verbosity) -> Vec<(String, Level)> {
    let recorder = Recorder::default();
    let subscriber = tracing_subscriber::registry()
        .with(build_filter(verbosity, None))
        .with(recorder.clone());
    tracing::subscriber::with_default(subscriber, emit_all);
    recorder.events()
}

#[test]
fn debug_verbosity_sees_every_subsystem() {
    let events = capture(Verbosity::Debug);
    let expected = [
        ("sitewarden::transport", Level::DEBUG),
        ("sitewarden::pacing", Level::DEBUG),
        ("sitewarden::negotiate", Level::DEBUG),
        ("sitewarden::inventory", Level::DEBUG),
        ("sitewarden::mutation", Level::INFO),
        ("sitewarden::verify", Level::INFO),
        ("sitewarden::batch", Level::INFO),
    ];
    let expected: Vec<_> = expected
        .iter()
        .map(|(target, level)| ((*target).to_owned(), *level))
        .collect();
    assert_eq!(events, expected);
}

#[test]
fn info_verbosity_keeps_only_progress_events() {
    let events = capture(Verbosity::Info);
    let targets: Vec<_> = events.iter().map(|(target, _)| target.as_str()).collect();
    assert_eq!(
        targets,
        ["sitewarden::mutation", "sitewarden::verify", "sitewarden::batch"]
    );
}

#[test]
fn normal_verbosity_is_silent_for_subsystem_traces() {
    assert!(capture(Verbosity::Normal).is_empty());
}
