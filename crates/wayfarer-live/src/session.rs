//! Live session: connection lifecycle, the mic frame pump, and the inbound
//! event loop.
//!
//! Inbound traffic arrives on an mpsc channel of `LiveEvent`s rather than
//! callbacks, so the event loop is a plain `select!` and teardown is a
//! `Notify`. Input transcription replaces the current turn accumulator,
//! output transcription appends, and a turn-complete event freezes both into
//! a `TurnRecord`. Audio payloads are decoded and queued on the playback
//! scheduler; an interruption drops everything scheduled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

use wayfarer_core::config::LiveSettings;
use wayfarer_core::error::{Result, WayfarerError};

use crate::pcm;
use crate::playback::PlaybackScheduler;
use crate::state::{LiveState, StateMachine};

/// One inbound event from the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Partial or final transcription of what the user is saying. Each event
    /// carries the whole utterance so far.
    InputTranscript { text: String, finished: bool },
    /// Incremental transcription of the model's spoken reply.
    OutputTranscript { text: String, finished: bool },
    /// Base64 PCM16-LE audio payload at the negotiated output rate.
    Audio { data: String },
    /// The user spoke over the model; scheduled audio must be dropped.
    Interrupted,
    /// Both sides of the exchange are final.
    TurnComplete,
}

/// An open realtime connection: outbound frame sender, inbound event
/// receiver. Dropping both ends closes it.
pub struct RealtimeConnection {
    pub frames: mpsc::Sender<String>,
    pub events: mpsc::Receiver<LiveEvent>,
}

/// Bidirectional realtime voice capability.
#[async_trait]
pub trait RealtimeBackend: Send + Sync {
    /// Open a connection configured for the given rates and language.
    async fn connect(&self, settings: &LiveSettings, language: &str) -> Result<RealtimeConnection>;
}

/// Capture device capability. Frames are f32 samples at the requested rate.
pub trait MicrophoneSource: Send + Sync {
    fn start(&self, sample_rate: u32) -> Result<mpsc::Receiver<Vec<f32>>>;
    fn stop(&self);
}

/// One completed voice exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRecord {
    pub user: String,
    pub bot: String,
}

/// Per-turn accumulators and the playback queue, shared with the event loop.
#[derive(Default)]
struct Shared {
    input: Mutex<String>,
    output: Mutex<String>,
    turns: Mutex<Vec<TurnRecord>>,
    scheduler: Mutex<PlaybackScheduler>,
}

/// A running live voice session.
pub struct LiveSession {
    state: StateMachine,
    mic: Arc<dyn MicrophoneSource>,
    shutdown: Arc<Notify>,
    shared: Arc<Shared>,
}

impl LiveSession {
    /// Open the microphone and the realtime channel, then start the frame
    /// pump and the event loop.
    ///
    /// A device or connect failure leaves the machine in the terminal
    /// `Error` state and is returned to the caller for a user-visible notice.
    pub async fn start(
        backend: Arc<dyn RealtimeBackend>,
        mic: Arc<dyn MicrophoneSource>,
        settings: LiveSettings,
        language: &str,
    ) -> Result<LiveSession> {
        let state = StateMachine::new();
        state.transition(LiveState::Connecting)?;

        let mut mic_rx = match mic.start(settings.input_sample_rate) {
            Ok(rx) => rx,
            Err(e) => {
                tracing::error!(error = %e, "Microphone start failed");
                state.transition(LiveState::Error)?;
                return Err(e);
            }
        };

        let connection = match backend.connect(&settings, language).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Realtime connect failed");
                mic.stop();
                state.transition(LiveState::Error)?;
                return Err(e);
            }
        };
        state.transition(LiveState::Connected)?;
        tracing::info!(language, "Live session connected");

        let shutdown = Arc::new(Notify::new());
        let shared = Arc::new(Shared::default());
        let started = Instant::now();

        let RealtimeConnection { frames, mut events } = connection;

        // Frame pump: encode and forward every mic frame as it arrives.
        let pump_shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = mic_rx.recv() => match frame {
                        Some(samples) => {
                            if frames.send(pcm::encode_frame(&samples)).await.is_err() {
                                tracing::debug!("Frame channel closed, pump stopping");
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = pump_shutdown.notified() => break,
                }
            }
        });

        // Event loop: a closed event channel is an orderly remote close.
        let loop_state = state.clone();
        let loop_shared = Arc::clone(&shared);
        let loop_shutdown = Arc::clone(&shutdown);
        let output_rate = settings.output_sample_rate;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(event) => handle_event(&loop_shared, event, started, output_rate),
                        None => {
                            loop_state.transition_if(LiveState::Connected, LiveState::Closed);
                            tracing::info!("Live session closed by remote");
                            break;
                        }
                    },
                    _ = loop_shutdown.notified() => break,
                }
            }
        });

        Ok(LiveSession {
            state,
            mic,
            shutdown,
            shared,
        })
    }

    /// Orderly teardown: stop the pump and the event loop, release the mic,
    /// drop scheduled audio, and close the machine.
    pub fn stop(&self) {
        self.shutdown.notify_waiters();
        self.mic.stop();
        self.shared
            .scheduler
            .lock()
            .expect("live mutex poisoned")
            .interrupt();
        let closed = self.state.transition_if(LiveState::Connected, LiveState::Closed)
            || self.state.transition_if(LiveState::Connecting, LiveState::Closed);
        if closed {
            tracing::info!("Live session closed");
        }
    }

    pub fn state(&self) -> LiveState {
        self.state.current()
    }

    /// The user utterance currently being transcribed.
    pub fn input_transcript(&self) -> String {
        self.shared.input.lock().expect("live mutex poisoned").clone()
    }

    /// The model reply transcribed so far this turn.
    pub fn output_transcript(&self) -> String {
        self.shared.output.lock().expect("live mutex poisoned").clone()
    }

    /// Completed exchanges, oldest first.
    pub fn turns(&self) -> Vec<TurnRecord> {
        self.shared.turns.lock().expect("live mutex poisoned").clone()
    }

    /// Clips currently queued for playback.
    pub fn scheduled_clips(&self) -> usize {
        self.shared
            .scheduler
            .lock()
            .expect("live mutex poisoned")
            .scheduled()
            .len()
    }

    /// Where the playback clock will place the next clip.
    pub fn next_playback_start(&self) -> f64 {
        self.shared
            .scheduler
            .lock()
            .expect("live mutex poisoned")
            .next_start()
    }
}

fn handle_event(shared: &Shared, event: LiveEvent, started: Instant, output_rate: u32) {
    match event {
        LiveEvent::InputTranscript { text, .. } => {
            *shared.input.lock().expect("live mutex poisoned") = text;
        }
        LiveEvent::OutputTranscript { text, .. } => {
            shared
                .output
                .lock()
                .expect("live mutex poisoned")
                .push_str(&text);
        }
        LiveEvent::TurnComplete => {
            let user = std::mem::take(&mut *shared.input.lock().expect("live mutex poisoned"));
            let bot = std::mem::take(&mut *shared.output.lock().expect("live mutex poisoned"));
            tracing::debug!(user = %user, "Live turn complete");
            shared
                .turns
                .lock()
                .expect("live mutex poisoned")
                .push(TurnRecord { user, bot });
        }
        LiveEvent::Audio { data } => match pcm::decode_pcm16(&data) {
            Ok(samples) => {
                let duration = pcm::duration_secs(samples.len(), output_rate);
                let now = started.elapsed().as_secs_f64();
                shared
                    .scheduler
                    .lock()
                    .expect("live mutex poisoned")
                    .schedule(duration, now);
            }
            Err(e) => tracing::warn!(error = %e, "Dropping malformed audio payload"),
        },
        LiveEvent::Interrupted => {
            shared
                .scheduler
                .lock()
                .expect("live mutex poisoned")
                .interrupt();
        }
    }
}

// =============================================================================
// Mocks
// =============================================================================

/// Scripted realtime backend for tests. Plays back its events and then either
/// closes the channel or holds it open.
#[derive(Default)]
pub struct MockRealtimeBackend {
    events: Mutex<Vec<LiveEvent>>,
    connect_error: Mutex<Option<String>>,
    hold_open: AtomicBool,
    sent_frames: Mutex<Option<mpsc::Receiver<String>>>,
}

impl MockRealtimeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the inbound events delivered after connect.
    pub fn with_events(self, events: Vec<LiveEvent>) -> Self {
        *self.events.lock().expect("mock mutex poisoned") = events;
        self
    }

    /// Keep the event channel open after the script runs.
    pub fn held_open(self) -> Self {
        self.hold_open.store(true, Ordering::SeqCst);
        self
    }

    /// Script connect to fail.
    pub fn with_connect_error(self, message: &str) -> Self {
        *self.connect_error.lock().expect("mock mutex poisoned") = Some(message.to_string());
        self
    }

    /// Receiver for the frames the session sent upstream.
    pub fn take_sent_frames(&self) -> Option<mpsc::Receiver<String>> {
        self.sent_frames.lock().expect("mock mutex poisoned").take()
    }
}

#[async_trait]
impl RealtimeBackend for MockRealtimeBackend {
    async fn connect(&self, _settings: &LiveSettings, _language: &str) -> Result<RealtimeConnection> {
        if let Some(msg) = self.connect_error.lock().expect("mock mutex poisoned").clone() {
            return Err(WayfarerError::Live(msg));
        }

        let (frames_tx, frames_rx) = mpsc::channel(64);
        *self.sent_frames.lock().expect("mock mutex poisoned") = Some(frames_rx);

        let scripted = std::mem::take(&mut *self.events.lock().expect("mock mutex poisoned"));
        let hold_open = self.hold_open.load(Ordering::SeqCst);
        let (events_tx, events_rx) = mpsc::channel(64);
        tokio::spawn(async move {
            for event in scripted {
                if events_tx.send(event).await.is_err() {
                    return;
                }
            }
            if hold_open {
                std::future::pending::<()>().await;
            }
        });

        Ok(RealtimeConnection {
            frames: frames_tx,
            events: events_rx,
        })
    }
}

/// Scripted capture device for tests.
#[derive(Default)]
pub struct MockMicrophone {
    frames: Mutex<Vec<Vec<f32>>>,
    fail: AtomicBool,
    stopped: AtomicBool,
}

impl MockMicrophone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the frames the device produces.
    pub fn with_frames(self, frames: Vec<Vec<f32>>) -> Self {
        *self.frames.lock().expect("mock mutex poisoned") = frames;
        self
    }

    /// Script the device to refuse to start.
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl MicrophoneSource for MockMicrophone {
    fn start(&self, _sample_rate: u32) -> Result<mpsc::Receiver<Vec<f32>>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WayfarerError::Live("Microphone unavailable".to_string()));
        }
        let frames = std::mem::take(&mut *self.frames.lock().expect("mock mutex poisoned"));
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            for frame in frames {
                if tx.send(frame).await.is_err() {
                    return;
                }
            }
            std::future::pending::<()>().await;
        });
        Ok(rx)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

// =============================================================================
// Tests
// =============================================================================
