//! Gapless playback scheduling.
//!
//! Decoded clips are queued against a monotonic scheduling clock: each clip
//! starts at `max(next_scheduled, now)` and advances `next_scheduled` by its
//! own duration, so back-to-back clips play seamlessly and a late arrival
//! after a gap starts immediately. An interruption discards every scheduled
//! clip and resets the clock to zero.

/// One clip queued for playback, in seconds on the playback clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledClip {
    pub start: f64,
    pub duration: f64,
}

/// Orders decoded audio clips on a monotonic clock.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    next_start: f64,
    clips: Vec<ScheduledClip>,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a clip of the given duration at time `now`, returning its start
    /// time on the playback clock.
    pub fn schedule(&mut self, duration: f64, now: f64) -> f64 {
        let start = self.next_start.max(now);
        self.next_start = start + duration;
        self.clips.push(ScheduledClip { start, duration });
        tracing::trace!(start, duration, "Clip scheduled");
        start
    }

    /// Discard everything scheduled and reset the clock. Called when the
    /// model is interrupted mid-reply and on teardown.
    pub fn interrupt(&mut self) {
        if !self.clips.is_empty() {
            tracing::debug!(dropped = self.clips.len(), "Playback interrupted");
        }
        self.clips.clear();
        self.next_start = 0.0;
    }

    /// When the next scheduled clip would start.
    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    /// Clips still scheduled (including ones already playing).
    pub fn scheduled(&self) -> &[ScheduledClip] {
        &self.clips
    }
}

// =============================================================================
// Tests
// =============================================================================
