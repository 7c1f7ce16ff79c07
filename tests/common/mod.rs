#![allow(dead_code)]

pub mod mock_output;
pub mod mock_voices;

use mock_output::MockOutput;
use mock_voices::MockVoices;
use std::sync::Arc;
use std::time::Duration;
use talkasmic::audio::Device;
use talkasmic::config::Config;
use talkasmic::queue::{QueueEvent, RequestId, RequestState};
use talkasmic::session::Session;
use tokio::sync::mpsc::UnboundedReceiver;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn speakers() -> Device {
    Device::new(0, "Speakers (Realtek Audio)", true)
}

pub fn cable() -> Device {
    Device::new(1, "CABLE Input (VB-Audio Virtual Cable)", false)
}

pub fn headphones() -> Device {
    Device::new(2, "Headphones", false)
}

pub struct TestContext {
    pub voices: Arc<MockVoices>,
    pub output: Arc<MockOutput>,
    pub session: Session,
}

impl TestContext {
    /// Session over mocks with speakers, cable and headphones, already refreshed
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let voices = Arc::new(MockVoices::new());
        let output = Arc::new(MockOutput::new(vec![speakers(), cable(), headphones()]));
        let session = Session::new(config, output.clone(), voices.clone());
        session.catalog.refresh().expect("Failed to refresh mock catalog");

        Self {
            voices,
            output,
            session,
        }
    }
}

/// Next event, failing the test if none arrives in time
pub async fn next_event(events: &mut UnboundedReceiver<QueueEvent>) -> QueueEvent {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("Timed out waiting for queue event")
        .expect("Event channel closed")
}

/// Collect events until `done` returns true for one of them (inclusive)
pub async fn collect_until<F>(events: &mut UnboundedReceiver<QueueEvent>, mut done: F) -> Vec<QueueEvent>
where
    F: FnMut(&QueueEvent) -> bool,
{
    let mut seen = Vec::new();
    loop {
        let event = next_event(events).await;
        let stop = done(&event);
        seen.push(event);
        if stop {
            return seen;
        }
    }
}

/// Collect events until the channel closes
pub async fn collect_all(events: &mut UnboundedReceiver<QueueEvent>) -> Vec<QueueEvent> {
    let mut seen = Vec::new();
    loop {
        match tokio::time::timeout(EVENT_TIMEOUT, events.recv()).await {
            Ok(Some(event)) => seen.push(event),
            Ok(None) => return seen,
            Err(_) => panic!("Timed out waiting for the event channel to close"),
        }
    }
}

/// (id, state) pairs for every state transition, in order
pub fn transitions(events: &[QueueEvent]) -> Vec<(RequestId, RequestState)> {
    events
        .iter()
        .filter_map(|e| match e {
            QueueEvent::StateChanged { id, state } => Some((*id, state.clone())),
            _ => None,
        })
        .collect()
}

/// Ids that reached a terminal state, in the order they got there
pub fn finished(events: &[QueueEvent]) -> Vec<RequestId> {
    transitions(events)
        .into_iter()
        .filter(|(_, state)| state.is_terminal())
        .map(|(id, _)| id)
        .collect()
}

pub fn is_terminal_for(event: &QueueEvent, wanted: RequestId) -> bool {
    matches!(event, QueueEvent::StateChanged { id, state } if *id == wanted && state.is_terminal())
}
