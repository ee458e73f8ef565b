use chrono::{DateTime, Local};

/// Upper bound on exercise rounds in one session
pub const MAX_ROUNDS: u8 = 3;

/// Data recorded over one run through the flow
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pulse_before: Option<u32>,
    pulse_after: Option<u32>,
    session_count: u8,
    pub started_at: DateTime<Local>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            pulse_before: None,
            pulse_after: None,
            session_count: 1,
            started_at: Local::now(),
        }
    }
}

impl Session {
    pub fn pulse_before(&self) -> Option<u32> {
        self.pulse_before
    }

    pub fn pulse_after(&self) -> Option<u32> {
        self.pulse_after
    }

    /// Rounds completed or in progress, always in `1..=MAX_ROUNDS`
    pub fn session_count(&self) -> u8 {
        self.session_count
    }

    pub fn can_repeat(&self) -> bool {
        self.session_count < MAX_ROUNDS
    }

    // Writers are crate-private: only the controller stores readings.

    /// Stamp the moment the user actually starts, not when the session was built
    pub(crate) fn begin(&mut self) {
        self.started_at = Local::now();
    }

    pub(crate) fn record_before(&mut self, bpm: u32) -> bool {
        if self.pulse_before.is_some() {
            return false;
        }
        self.pulse_before = Some(bpm);
        true
    }

    pub(crate) fn record_after(&mut self, bpm: u32) -> bool {
        if self.pulse_after.is_some() {
            return false;
        }
        self.pulse_after = Some(bpm);
        true
    }

    pub(crate) fn next_round(&mut self) -> bool {
        if !self.can_repeat() {
            return false;
        }
        self.session_count += 1;
        true
    }

    /// "1 Session", "2 Sessions", ...
    pub fn label(&self) -> String {
        session_label(self.session_count)
    }
}

pub fn session_label(count: u8) -> String {
    format!("{} Session{}", count, if count > 1 { "s" } else { "" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session() {
        let s = Session::default();
        assert_eq!(s.session_count(), 1);
        assert_eq!(s.pulse_before(), None);
        assert_eq!(s.pulse_after(), None);
        assert!(s.can_repeat());
    }

    #[test]
    fn readings_are_write_once() {
        let mut s = Session::default();
        assert!(s.record_before(72));
        assert!(!s.record_before(80));
        assert_eq!(s.pulse_before(), Some(72));

        assert!(s.record_after(95));
        assert!(!s.record_after(100));
        assert_eq!(s.pulse_after(), Some(95));
    }

    #[test]
    fn rounds_are_capped() {
        let mut s = Session::default();
        assert!(s.next_round());
        assert!(s.next_round());
        assert!(!s.next_round());
        assert_eq!(s.session_count(), MAX_ROUNDS);
        assert!(!s.can_repeat());
    }

    #[test]
    fn labels() {
        assert_eq!(session_label(1), "1 Session");
        assert_eq!(session_label(2), "2 Sessions");
        assert_eq!(session_label(3), "3 Sessions");
    }
}
