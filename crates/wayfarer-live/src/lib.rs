//! Live voice conversation: realtime connection lifecycle, PCM frame codec,
//! and gapless playback scheduling.
//!
//! Microphone frames are encoded and forwarded to the realtime channel as
//! they arrive; inbound events (transcripts, audio, interruptions) drive the
//! per-turn accumulators and the playback clock.

pub mod pcm;
pub mod playback;
pub mod session;
pub mod state;

pub use playback::PlaybackScheduler;
pub use session::{
    LiveEvent, LiveSession, MicrophoneSource, MockMicrophone, MockRealtimeBackend,
    RealtimeBackend, RealtimeConnection, TurnRecord,
};
pub use state::{LiveState, StateMachine};
