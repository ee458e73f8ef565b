use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::trace;

/// Audible signal emitted by the countdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Short low beep: preparation ticks and the last seconds of a countdown
    Tick,
    /// Long high beep: a countdown reached zero
    Go,
}

impl Cue {
    pub fn pitch_hz(&self) -> u32 {
        match self {
            Cue::Tick => 440,
            Cue::Go => 880,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Cue::Tick => Duration::from_millis(100),
            Cue::Go => Duration::from_millis(500),
        }
    }
}

/// Fire-and-forget cue emitter. Implementations must not block or fail visibly.
pub trait CueSink: Send {
    fn emit(&self, cue: Cue);
}

/// Rings the terminal bell: once for a tick, twice for go
#[derive(Debug, Default, Clone, Copy)]
pub struct BellCueSink;

impl CueSink for BellCueSink {
    fn emit(&self, cue: Cue) {
        trace!(pitch_hz = cue.pitch_hz(), duration_ms = cue.duration().as_millis() as u64, "cue");
        let bells: &[u8] = match cue {
            Cue::Tick => b"\x07",
            Cue::Go => b"\x07\x07",
        };
        let mut out = io::stdout();
        let _ = out.write_all(bells).and_then(|_| out.flush());
    }
}

/// Emits nothing (`--mute`)
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCueSink;

impl CueSink for SilentCueSink {
    fn emit(&self, cue: Cue) {
        trace!(?cue, "cue muted");
    }
}

/// Keeps every emitted cue; clones share the same log
#[derive(Debug, Default, Clone)]
pub struct RecordingCueSink {
    log: Arc<Mutex<Vec<Cue>>>,
}

impl RecordingCueSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Returns and forgets everything recorded so far
    pub fn drain(&self) -> Vec<Cue> {
        self.log
            .lock()
            .map(|mut log| std::mem::take(&mut *log))
            .unwrap_or_default()
    }
}

impl CueSink for RecordingCueSink {
    fn emit(&self, cue: Cue) {
        if let Ok(mut log) = self.log.lock() {
            log.push(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_pitches_and_lengths() {
        assert_eq!(Cue::Tick.pitch_hz(), 440);
        assert_eq!(Cue::Go.pitch_hz(), 880);
        assert_eq!(Cue::Tick.duration(), Duration::from_millis(100));
        assert_eq!(Cue::Go.duration(), Duration::from_millis(500));
    }

    #[test]
    fn recording_sink_shares_log_between_clones() {
        let sink = RecordingCueSink::new();
        let handle = sink.clone();
        sink.emit(Cue::Tick);
        sink.emit(Cue::Go);
        assert_eq!(handle.cues(), vec![Cue::Tick, Cue::Go]);
        assert_eq!(handle.drain(), vec![Cue::Tick, Cue::Go]);
        assert!(sink.cues().is_empty());
    }
}
