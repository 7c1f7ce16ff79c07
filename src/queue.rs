//! Speech request queue
//!
//! Callers talk to a single worker task through [`QueueCommand`]s; the worker
//! reports back through [`QueueEvent`]s. At most one request is synthesizing
//! or playing at any time and requests are served strictly in submission
//! order.
//!
//! There is no timeout on synthesis or playback: a hung OS call stalls the
//! queue until it returns.

use crate::audio::{AudioRouter, Device, MonitorPlayback};
use crate::catalog::{CatalogSnapshot, DeviceCatalog};
use crate::error::{TalkError, TalkResult};
use crate::tts::SpeechEngine;
use futures::future::OptionFuture;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Characters of text shown when a request is summarised
const PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything needed to speak one utterance
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: Option<String>,
    pub rate: i32,
    pub volume: i32,
    pub primary: Device,
    pub monitor: Option<Device>,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, primary: Device) -> Self {
        Self {
            text: text.into(),
            voice_id: None,
            rate: 0,
            volume: 100,
            primary,
            monitor: None,
        }
    }

    pub fn voice(mut self, voice_id: Option<String>) -> Self {
        self.voice_id = voice_id;
        self
    }

    pub fn rate(mut self, rate: i32) -> Self {
        self.rate = rate;
        self
    }

    pub fn volume(mut self, volume: i32) -> Self {
        self.volume = volume;
        self
    }

    pub fn monitor(mut self, monitor: Option<Device>) -> Self {
        self.monitor = monitor;
        self
    }

    /// First characters of the text, with an ellipsis when truncated
    pub fn preview(&self) -> String {
        let mut preview: String = self.text.chars().take(PREVIEW_CHARS).collect();
        if self.text.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        preview
    }
}

/// Lifecycle of one request
#[derive(Debug, Clone)]
pub enum RequestState {
    Pending,
    Synthesizing,
    Playing,
    Completed,
    Failed(Arc<TalkError>),
}

impl RequestState {
    /// Synthesizing or playing
    pub fn is_active(&self) -> bool {
        matches!(self, RequestState::Synthesizing | RequestState::Playing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Completed | RequestState::Failed(_))
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Pending => write!(f, "pending"),
            RequestState::Synthesizing => write!(f, "synthesizing"),
            RequestState::Playing => write!(f, "playing"),
            RequestState::Completed => write!(f, "completed"),
            RequestState::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Commands sent to the worker
#[derive(Debug)]
pub enum QueueCommand {
    Enqueue(RequestId, SpeechRequest),
    /// Drop every pending request; the in-flight one runs to completion
    Clear,
    /// Re-enumerate devices and voices
    Refresh,
    /// Stop accepting work once the in-flight request is done
    Shutdown,
}

/// Notifications emitted by the worker
#[derive(Debug, Clone)]
pub enum QueueEvent {
    StateChanged { id: RequestId, state: RequestState },
    /// Pending requests removed by a clear, in submission order
    Cleared { discarded: Vec<RequestId> },
    /// The monitor stream failed; the request itself is unaffected
    MonitorFailed {
        id: RequestId,
        device: Device,
        error: Arc<TalkError>,
    },
    CatalogRefreshed(CatalogSnapshot),
    RefreshFailed { error: Arc<TalkError> },
    /// Nothing in flight and nothing pending
    Idle,
}

/// Handle used to submit work to the queue worker
#[derive(Debug, Clone)]
pub struct SpeechQueue {
    commands: UnboundedSender<QueueCommand>,
    next_id: Arc<AtomicU64>,
}

impl SpeechQueue {
    /// Start the worker on the current tokio runtime
    pub fn spawn(
        engine: SpeechEngine,
        router: Arc<AudioRouter>,
        catalog: Arc<DeviceCatalog>,
    ) -> (Self, UnboundedReceiver<QueueEvent>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            engine,
            router,
            catalog,
            events,
            pending: VecDeque::new(),
            in_flight: None,
            busy: false,
        };
        tokio::spawn(worker.run(command_rx));

        let queue = Self {
            commands,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (queue, event_rx)
    }

    /// Append a request; never blocks
    pub fn enqueue(&self, request: SpeechRequest) -> TalkResult<RequestId> {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.send(QueueCommand::Enqueue(id, request))?;
        Ok(id)
    }

    pub fn clear(&self) -> TalkResult<()> {
        self.send(QueueCommand::Clear)
    }

    pub fn refresh(&self) -> TalkResult<()> {
        self.send(QueueCommand::Refresh)
    }

    pub fn shutdown(&self) -> TalkResult<()> {
        self.send(QueueCommand::Shutdown)
    }

    fn send(&self, command: QueueCommand) -> TalkResult<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow::anyhow!("Speech queue worker has stopped").into())
    }
}

type PlaybackTask = JoinHandle<TalkResult<Option<MonitorPlayback>>>;

struct InFlight {
    id: RequestId,
    task: PlaybackTask,
}

struct Worker {
    engine: SpeechEngine,
    router: Arc<AudioRouter>,
    catalog: Arc<DeviceCatalog>,
    events: UnboundedSender<QueueEvent>,
    pending: VecDeque<(RequestId, SpeechRequest)>,
    in_flight: Option<InFlight>,
    /// Set once work starts, cleared when `Idle` is reported
    busy: bool,
}

impl Worker {
    async fn run(mut self, mut commands: UnboundedReceiver<QueueCommand>) {
        info!("🗣️ Speech queue started");
        let mut accepting = true;

        loop {
            self.advance();
            if !accepting && self.in_flight.is_none() {
                break;
            }

            let in_flight = OptionFuture::from(self.in_flight.as_mut().map(|f| &mut f.task));
            tokio::select! {
                command = commands.recv(), if accepting => match command {
                    Some(QueueCommand::Enqueue(id, request)) => self.push(id, request),
                    Some(QueueCommand::Clear) => self.clear(),
                    Some(QueueCommand::Refresh) => self.refresh(),
                    Some(QueueCommand::Shutdown) | None => {
                        debug!("Speech queue shutting down");
                        accepting = false;
                        self.clear();
                    }
                },
                Some(joined) = in_flight => {
                    if let Some(done) = self.in_flight.take() {
                        self.finish(done.id, joined);
                    }
                }
            }
        }

        info!("🗣️ Speech queue stopped");
    }

    fn emit(&self, event: QueueEvent) {
        // The UI may have gone away; the queue keeps draining regardless
        let _ = self.events.send(event);
    }

    fn push(&mut self, id: RequestId, request: SpeechRequest) {
        debug!("Queued {} '{}'", id, request.preview());
        self.pending.push_back((id, request));
        self.emit(QueueEvent::StateChanged {
            id,
            state: RequestState::Pending,
        });
    }

    /// Start the next pending request if nothing is in flight
    fn advance(&mut self) {
        if self.in_flight.is_some() {
            return;
        }

        match self.pending.pop_front() {
            Some((id, request)) => self.start(id, request),
            None => {
                if self.busy {
                    self.busy = false;
                    self.emit(QueueEvent::Idle);
                }
            }
        }
    }

    fn start(&mut self, id: RequestId, request: SpeechRequest) {
        info!("📢 Speaking {} '{}'", id, request.preview());
        self.busy = true;
        self.emit(QueueEvent::StateChanged {
            id,
            state: RequestState::Synthesizing,
        });

        let engine = self.engine.clone();
        let router = Arc::clone(&self.router);
        let events = self.events.clone();

        let task = tokio::task::spawn_blocking(move || {
            let waveform = engine.synthesize(
                &request.text,
                request.voice_id.as_deref(),
                request.rate,
                request.volume,
            )?;

            let _ = events.send(QueueEvent::StateChanged {
                id,
                state: RequestState::Playing,
            });
            router.play(Arc::new(waveform), &request.primary, request.monitor.as_ref())
        });

        self.in_flight = Some(InFlight { id, task });
    }

    fn finish(
        &mut self,
        id: RequestId,
        joined: Result<TalkResult<Option<MonitorPlayback>>, tokio::task::JoinError>,
    ) {
        let outcome = joined.unwrap_or_else(|e| {
            Err(TalkError::Other(anyhow::anyhow!("Speech task aborted: {}", e)))
        });

        match outcome {
            Ok(monitor) => {
                info!("✅ {} completed", id);
                self.emit(QueueEvent::StateChanged {
                    id,
                    state: RequestState::Completed,
                });
                if let Some(monitor) = monitor {
                    self.watch_monitor(id, monitor);
                }
            }
            Err(e) => {
                error!("❌ {} failed: {}", id, e);
                self.emit(QueueEvent::StateChanged {
                    id,
                    state: RequestState::Failed(Arc::new(e)),
                });
            }
        }
    }

    /// Join the monitor stream off the worker, for reporting only
    fn watch_monitor(&self, id: RequestId, monitor: MonitorPlayback) {
        let events = self.events.clone();
        tokio::task::spawn_blocking(move || {
            let device = monitor.device().clone();
            match monitor.wait() {
                Ok(()) => debug!("Monitor playback for {} finished on {}", id, device),
                Err(e) => {
                    let _ = events.send(QueueEvent::MonitorFailed {
                        id,
                        device,
                        error: Arc::new(e),
                    });
                }
            }
        });
    }

    fn clear(&mut self) {
        let discarded: Vec<RequestId> = self.pending.drain(..).map(|(id, _)| id).collect();
        if !discarded.is_empty() {
            info!("🧹 Discarded {} pending requests", discarded.len());
        }
        self.emit(QueueEvent::Cleared { discarded });
    }

    /// Enumerate in the background; never waits for the in-flight request
    fn refresh(&self) {
        let catalog = Arc::clone(&self.catalog);
        let events = self.events.clone();
        tokio::task::spawn_blocking(move || {
            let event = match catalog.refresh() {
                Ok(snapshot) => QueueEvent::CatalogRefreshed(snapshot),
                Err(e) => {
                    warn!("⚠️ Catalog refresh failed: {}", e);
                    QueueEvent::RefreshFailed { error: Arc::new(e) }
                }
            };
            let _ = events.send(event);
        });
    }
}
