use std::time::Duration;

use tracing::trace;

use crate::audio::{Cue, CueSink};

/// Length of every preparation countdown
pub const PREP_SECS: u32 = 3;
/// Length of a pulse measurement window
pub const PULSE_WINDOW_SECS: u32 = 15;
/// Active countdowns beep while this many seconds or fewer remain
const FINAL_STRETCH_SECS: u32 = 3;

const ONE_SECOND: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum CountdownKind {
    /// Fixed 3 second lead-in before a timed phase
    Prep,
    /// Pulse window or timed exercise
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    /// Reached zero; the go cue has already been emitted
    Expired,
}

/// A one-second countdown owned by exactly one controller state.
///
/// Wall-clock time fed through [`Countdown::carry`] accumulates here, so
/// dropping the countdown (leaving its state) also drops any partial second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    kind: CountdownKind,
    remaining: u32,
    carried: Duration,
}

impl Countdown {
    pub fn prep() -> Self {
        Self::new(CountdownKind::Prep, PREP_SECS)
    }

    pub fn active(secs: u32) -> Self {
        Self::new(CountdownKind::Active, secs)
    }

    fn new(kind: CountdownKind, remaining: u32) -> Self {
        Self {
            kind,
            remaining,
            carried: Duration::ZERO,
        }
    }

    pub fn kind(&self) -> CountdownKind {
        self.kind
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Applies one whole-second tick and emits the cues for it.
    pub fn tick(&mut self, cues: &dyn CueSink) -> TickOutcome {
        match self.kind {
            CountdownKind::Prep => {
                self.remaining = self.remaining.saturating_sub(1);
                cues.emit(Cue::Tick);
            }
            CountdownKind::Active => {
                if (1..=FINAL_STRETCH_SECS).contains(&self.remaining) {
                    cues.emit(Cue::Tick);
                }
                self.remaining = self.remaining.saturating_sub(1);
            }
        }
        trace!(kind = %self.kind, remaining = self.remaining, "countdown tick");

        if self.remaining == 0 {
            cues.emit(Cue::Go);
            TickOutcome::Expired
        } else {
            TickOutcome::Running
        }
    }

    /// Adds elapsed wall-clock time
    pub fn carry(&mut self, elapsed: Duration) {
        self.carried += elapsed;
    }

    /// Consumes one accumulated second, if there is one
    pub fn take_second(&mut self) -> bool {
        if self.carried >= ONE_SECOND {
            self.carried -= ONE_SECOND;
            true
        } else {
            false
        }
    }

    /// Fraction of the countdown still to run, for gauges
    pub fn ratio_of(&self, total: u32) -> f64 {
        if total == 0 {
            0.0
        } else {
            (self.remaining as f64 / total as f64).clamp(0.0, 1.0)
        }
    }
}
