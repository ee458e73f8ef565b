//! Session controller: the state machine that walks a user from the first pulse
//! check through the exercise rounds to the final summary.
//!
//! Timer ownership lives in [`State`] itself. Only the timer-driving variants
//! carry a [`Countdown`], so replacing the state is what cancels a timer.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info, trace};

use crate::audio::CueSink;
use crate::countdown::{Countdown, CountdownKind, TickOutcome, PULSE_WINDOW_SECS};
use crate::exercise::Exercise;
use crate::export::ExportRecord;
use crate::session::Session;

/// Flat view of [`State`], without per-state data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Start,
    PulseBeforePrep,
    PulseBeforeCountdown,
    PulseBeforeInput,
    ExercisePrep,
    ExerciseTimer,
    ExerciseLoop,
    SessionCheck,
    PulseAfterPrep,
    PulseAfterCountdown,
    PulseAfterInput,
    FinalSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Start,
    PulseBeforePrep(Countdown),
    PulseBeforeCountdown(Countdown),
    PulseBeforeInput,
    ExercisePrep { index: usize, countdown: Countdown },
    ExerciseTimer { index: usize, countdown: Countdown },
    ExerciseLoop { index: usize },
    SessionCheck,
    PulseAfterPrep(Countdown),
    PulseAfterCountdown(Countdown),
    PulseAfterInput,
    FinalSummary,
}

impl State {
    pub fn stage(&self) -> Stage {
        match self {
            State::Start => Stage::Start,
            State::PulseBeforePrep(_) => Stage::PulseBeforePrep,
            State::PulseBeforeCountdown(_) => Stage::PulseBeforeCountdown,
            State::PulseBeforeInput => Stage::PulseBeforeInput,
            State::ExercisePrep { .. } => Stage::ExercisePrep,
            State::ExerciseTimer { .. } => Stage::ExerciseTimer,
            State::ExerciseLoop { .. } => Stage::ExerciseLoop,
            State::SessionCheck => Stage::SessionCheck,
            State::PulseAfterPrep(_) => Stage::PulseAfterPrep,
            State::PulseAfterCountdown(_) => Stage::PulseAfterCountdown,
            State::PulseAfterInput => Stage::PulseAfterInput,
            State::FinalSummary => Stage::FinalSummary,
        }
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        match self {
            State::PulseBeforePrep(cd)
            | State::PulseBeforeCountdown(cd)
            | State::PulseAfterPrep(cd)
            | State::PulseAfterCountdown(cd)
            | State::ExercisePrep { countdown: cd, .. }
            | State::ExerciseTimer { countdown: cd, .. } => Some(cd),
            _ => None,
        }
    }

    fn countdown_mut(&mut self) -> Option<&mut Countdown> {
        match self {
            State::PulseBeforePrep(cd)
            | State::PulseBeforeCountdown(cd)
            | State::PulseAfterPrep(cd)
            | State::PulseAfterCountdown(cd)
            | State::ExercisePrep { countdown: cd, .. }
            | State::ExerciseTimer { countdown: cd, .. } => Some(cd),
            _ => None,
        }
    }

    pub fn exercise_index(&self) -> Option<usize> {
        match self {
            State::ExercisePrep { index, .. }
            | State::ExerciseTimer { index, .. }
            | State::ExerciseLoop { index } => Some(*index),
            _ => None,
        }
    }
}

/// Parse a typed pulse reading. Empty, zero and non-numeric input is rejected.
pub fn parse_pulse(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|bpm| *bpm > 0)
}

pub struct Workout {
    exercises: Vec<Exercise>,
    state: State,
    session: Session,
    cues: Box<dyn CueSink>,
}

impl fmt::Debug for Workout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workout")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("exercises", &self.exercises.len())
            .finish()
    }
}

impl Workout {
    pub fn new(exercises: Vec<Exercise>, cues: Box<dyn CueSink>) -> Self {
        Self {
            exercises,
            state: State::Start,
            session: Session::default(),
            cues,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.state
            .exercise_index()
            .and_then(|idx| self.exercises.get(idx))
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        self.state.countdown()
    }

    pub fn prep_countdown_active(&self) -> bool {
        self.countdown()
            .is_some_and(|cd| cd.kind() == CountdownKind::Prep)
    }

    pub fn active_countdown_active(&self) -> bool {
        self.countdown()
            .is_some_and(|cd| cd.kind() == CountdownKind::Active)
    }

    /// Whether the repeat choice is on offer at the session check
    pub fn can_repeat(&self) -> bool {
        self.session.can_repeat()
    }

    /// Length of the running active countdown, for progress display
    pub fn active_total_secs(&self) -> Option<u32> {
        match &self.state {
            State::PulseBeforeCountdown(_) | State::PulseAfterCountdown(_) => {
                Some(PULSE_WINDOW_SECS)
            }
            State::ExerciseTimer { index, .. } => {
                self.exercises.get(*index).and_then(Exercise::timed_secs)
            }
            _ => None,
        }
    }

    fn transition(&mut self, next: State) {
        debug!(from = %self.state.stage(), to = %next.stage(), "transition");
        self.state = next;
    }

    /// Enter exercise `index`: prep for timed ones, straight to the loop for
    /// user-paced ones, the session check past the end of the list.
    fn enter_exercise(&mut self, index: usize) {
        let next = match self.exercises.get(index) {
            Some(ex) if ex.is_timed() => State::ExercisePrep {
                index,
                countdown: Countdown::prep(),
            },
            Some(_) => State::ExerciseLoop { index },
            None => State::SessionCheck,
        };
        self.transition(next);
    }

    /// START -> PULSE_BEFORE_PREP
    pub fn start(&mut self) -> bool {
        if self.state != State::Start {
            return false;
        }
        info!("session started");
        self.session.begin();
        self.transition(State::PulseBeforePrep(Countdown::prep()));
        true
    }

    /// Submit typed pulse text in one of the input states
    pub fn submit_pulse(&mut self, raw: &str) -> bool {
        match parse_pulse(raw) {
            Some(bpm) => self.submit_pulse_value(bpm),
            None => {
                trace!(input = raw, "pulse reading rejected");
                false
            }
        }
    }

    pub fn submit_pulse_value(&mut self, bpm: u32) -> bool {
        if bpm == 0 {
            return false;
        }
        match self.state {
            State::PulseBeforeInput => {
                if !self.session.record_before(bpm) {
                    return false;
                }
                info!(bpm, "pulse before recorded");
                self.enter_exercise(0);
                true
            }
            State::PulseAfterInput => {
                if !self.session.record_after(bpm) {
                    return false;
                }
                info!(bpm, "pulse after recorded");
                self.transition(State::FinalSummary);
                true
            }
            _ => false,
        }
    }

    /// User confirms the current exercise is done
    pub fn continue_exercise(&mut self) -> bool {
        let State::ExerciseLoop { index } = self.state else {
            return false;
        };
        self.enter_exercise(index + 1);
        true
    }

    /// Repeat-or-stop at the session check. Repeat is ignored at the round cap.
    pub fn decide(&mut self, repeat: bool) -> bool {
        if self.state != State::SessionCheck {
            return false;
        }
        if repeat && self.session.next_round() {
            info!(round = self.session.session_count(), "starting another round");
            self.enter_exercise(0);
        } else {
            info!(rounds = self.session.session_count(), "rounds finished");
            self.transition(State::PulseAfterPrep(Countdown::prep()));
        }
        true
    }

    /// Drop the current session and return to START
    pub fn reset(&mut self) -> bool {
        debug!(from = %self.state.stage(), "reset");
        self.session = Session::default();
        self.state = State::Start;
        true
    }

    /// One whole-second tick of the running countdown, if any
    pub fn tick(&mut self) -> bool {
        let Some(countdown) = self.state.countdown_mut() else {
            return false;
        };
        if countdown.tick(&*self.cues) == TickOutcome::Running {
            return true;
        }

        let next = match &self.state {
            State::PulseBeforePrep(_) => {
                State::PulseBeforeCountdown(Countdown::active(PULSE_WINDOW_SECS))
            }
            State::PulseBeforeCountdown(_) => State::PulseBeforeInput,
            State::ExercisePrep { index, .. } => {
                let index = *index;
                match self.exercises.get(index).and_then(Exercise::timed_secs) {
                    Some(secs) => State::ExerciseTimer {
                        index,
                        countdown: Countdown::active(secs),
                    },
                    None => State::ExerciseLoop { index },
                }
            }
            State::ExerciseTimer { index, .. } => State::ExerciseLoop { index: *index },
            State::PulseAfterPrep(_) => {
                State::PulseAfterCountdown(Countdown::active(PULSE_WINDOW_SECS))
            }
            State::PulseAfterCountdown(_) => State::PulseAfterInput,
            _ => return true,
        };
        self.transition(next);
        true
    }

    /// Feed elapsed wall-clock time. Fires one tick per whole second that the
    /// current countdown has accumulated; time carried by a countdown is lost
    /// with it when its state is left.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        let Some(countdown) = self.state.countdown_mut() else {
            return false;
        };
        countdown.carry(elapsed);

        let mut changed = false;
        while self
            .state
            .countdown_mut()
            .is_some_and(|cd| cd.take_second())
        {
            changed |= self.tick();
        }
        changed
    }

    /// Record for the export sinks; only available at the final summary
    pub fn export_record(&self, date: NaiveDate) -> Option<ExportRecord> {
        if self.state != State::FinalSummary {
            return None;
        }
        Some(ExportRecord {
            date,
            pulse_before: self.session.pulse_before()?,
            pulse_after: self.session.pulse_after()?,
            session_label: self.session.label(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Cue, RecordingCueSink};
    use crate::exercise::default_catalog;
    use assert_matches::assert_matches;

    fn workout() -> (Workout, RecordingCueSink) {
        let cues = RecordingCueSink::new();
        (Workout::new(default_catalog(), Box::new(cues.clone())), cues)
    }

    fn ticks(w: &mut Workout, n: u32) {
        for _ in 0..n {
            w.tick();
        }
    }

    fn to_pulse_before_input(w: &mut Workout) {
        assert!(w.start());
        ticks(w, 3);
        ticks(w, 15);
        assert_eq!(w.stage(), Stage::PulseBeforeInput);
    }

    /// From an exercise state, finish it: run any timers and confirm
    fn finish_exercise(w: &mut Workout) {
        if w.stage() == Stage::ExercisePrep {
            ticks(w, 3);
        }
        if w.stage() == Stage::ExerciseTimer {
            let secs = w.countdown().unwrap().remaining();
            ticks(w, secs);
        }
        assert_eq!(w.stage(), Stage::ExerciseLoop);
        assert!(w.continue_exercise());
    }

    fn finish_round(w: &mut Workout) {
        while w.stage() != Stage::SessionCheck {
            finish_exercise(w);
        }
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::PulseBeforePrep.to_string(), "PULSE_BEFORE_PREP");
        assert_eq!(Stage::FinalSummary.to_string(), "FINAL_SUMMARY");
    }

    #[test]
    fn parse_pulse_rules() {
        assert_eq!(parse_pulse("72"), Some(72));
        assert_eq!(parse_pulse(" 95 "), Some(95));
        assert_eq!(parse_pulse("0"), None);
        assert_eq!(parse_pulse(""), None);
        assert_eq!(parse_pulse("abc"), None);
        assert_eq!(parse_pulse("-5"), None);
    }

    #[test]
    fn start_arms_prep_countdown() {
        let (mut w, cues) = workout();
        assert_eq!(w.stage(), Stage::Start);
        assert!(w.start());
        assert_eq!(w.stage(), Stage::PulseBeforePrep);
        assert_eq!(w.countdown().unwrap().remaining(), 3);
        assert!(w.prep_countdown_active());
        assert!(!w.active_countdown_active());
        assert!(cues.cues().is_empty());

        // start only applies at START
        assert!(!w.start());
    }

    #[test]
    fn prep_expiry_starts_pulse_window_with_go_cue() {
        let (mut w, cues) = workout();
        w.start();
        ticks(&mut w, 3);
        assert_eq!(w.stage(), Stage::PulseBeforeCountdown);
        assert_eq!(w.countdown().unwrap().remaining(), 15);
        assert_eq!(cues.drain(), vec![Cue::Tick, Cue::Tick, Cue::Tick, Cue::Go]);

        ticks(&mut w, 15);
        assert_eq!(w.stage(), Stage::PulseBeforeInput);
        assert_eq!(cues.drain(), vec![Cue::Tick, Cue::Tick, Cue::Tick, Cue::Go]);
        assert!(w.countdown().is_none());
    }

    #[test]
    fn invalid_pulse_is_a_no_op() {
        let (mut w, _) = workout();
        to_pulse_before_input(&mut w);

        for bad in ["0", "", "abc", "-1"] {
            assert!(!w.submit_pulse(bad));
            assert_eq!(w.stage(), Stage::PulseBeforeInput);
            assert_eq!(w.session().pulse_before(), None);
        }
        assert!(!w.submit_pulse_value(0));

        assert!(w.submit_pulse("72"));
        assert_eq!(w.session().pulse_before(), Some(72));
    }

    #[test]
    fn untimed_exercise_skips_timers() {
        let (mut w, cues) = workout();
        to_pulse_before_input(&mut w);
        cues.drain();

        w.submit_pulse("72");
        assert_eq!(w.stage(), Stage::ExerciseLoop);
        assert_eq!(w.current_exercise().unwrap().name, "Squats");
        assert!(w.countdown().is_none());
        assert!(cues.cues().is_empty());
    }

    #[test]
    fn timed_exercise_runs_prep_then_timer_then_loop() {
        let (mut w, cues) = workout();
        to_pulse_before_input(&mut w);
        w.submit_pulse("72");
        w.continue_exercise(); // squats -> push-ups
        w.continue_exercise(); // push-ups -> mountain climber
        cues.drain();

        assert_matches!(w.state(), State::ExercisePrep { index: 2, .. });
        assert_eq!(w.current_exercise().unwrap().name, "Mountain climber");
        ticks(&mut w, 3);
        assert_matches!(w.state(), State::ExerciseTimer { index: 2, countdown } if countdown.remaining() == 30);
        assert_eq!(w.active_total_secs(), Some(30));

        // no continuing while the timer runs
        assert!(!w.continue_exercise());

        ticks(&mut w, 29);
        assert_eq!(w.stage(), Stage::ExerciseTimer);
        ticks(&mut w, 1);
        assert_matches!(w.state(), State::ExerciseLoop { index: 2 });
    }

    #[test]
    fn final_three_seconds_beep_then_go_once() {
        let (mut w, cues) = workout();
        to_pulse_before_input(&mut w);
        w.submit_pulse("72");
        w.continue_exercise();
        w.continue_exercise();
        ticks(&mut w, 3);
        ticks(&mut w, 27);
        assert_eq!(w.countdown().unwrap().remaining(), 3);
        cues.drain();

        w.tick();
        w.tick();
        assert_eq!(cues.cues(), vec![Cue::Tick, Cue::Tick]);
        assert_eq!(w.stage(), Stage::ExerciseTimer);
        w.tick();
        assert_eq!(cues.drain(), vec![Cue::Tick, Cue::Tick, Cue::Tick, Cue::Go]);
        assert_eq!(w.stage(), Stage::ExerciseLoop);
    }

    #[test]
    fn session_check_repeat_and_cap() {
        let (mut w, _) = workout();
        to_pulse_before_input(&mut w);
        w.submit_pulse("72");
        finish_round(&mut w);

        assert!(w.can_repeat());
        assert!(w.decide(true));
        assert_eq!(w.session().session_count(), 2);
        assert_matches!(w.state(), State::ExerciseLoop { index: 0 });

        finish_round(&mut w);
        w.decide(true);
        assert_eq!(w.session().session_count(), 3);
        finish_round(&mut w);

        assert!(!w.can_repeat());
        assert!(w.decide(true));
        assert_eq!(w.stage(), Stage::PulseAfterPrep);
        assert_eq!(w.session().session_count(), 3);
    }

    #[test]
    fn stop_goes_to_pulse_after() {
        let (mut w, _) = workout();
        to_pulse_before_input(&mut w);
        w.submit_pulse("72");
        finish_round(&mut w);
        w.decide(false);
        assert_eq!(w.stage(), Stage::PulseAfterPrep);
        assert_eq!(w.countdown().unwrap().remaining(), 3);
        ticks(&mut w, 3);
        assert_eq!(w.stage(), Stage::PulseAfterCountdown);
        ticks(&mut w, 15);
        assert_eq!(w.stage(), Stage::PulseAfterInput);

        assert!(!w.submit_pulse("zero"));
        assert!(w.submit_pulse("95"));
        assert_eq!(w.stage(), Stage::FinalSummary);
        assert_eq!(w.session().pulse_after(), Some(95));
    }

    #[test]
    fn events_outside_their_state_are_ignored() {
        let (mut w, _) = workout();
        assert!(!w.submit_pulse("72"));
        assert!(!w.continue_exercise());
        assert!(!w.decide(true));
        assert!(!w.tick());
        assert!(!w.advance(Duration::from_secs(5)));
        assert_eq!(w.stage(), Stage::Start);
        assert_eq!(w.session().pulse_before(), None);
    }

    #[test]
    fn advance_fires_once_per_whole_second() {
        let (mut w, _) = workout();
        w.start();
        w.advance(Duration::from_millis(900));
        assert_eq!(w.countdown().unwrap().remaining(), 3);
        w.advance(Duration::from_millis(200));
        assert_eq!(w.countdown().unwrap().remaining(), 2);
        w.advance(Duration::from_millis(2_500));
        // prep expired; the leftover half second is not carried into the pulse window
        assert_eq!(w.stage(), Stage::PulseBeforeCountdown);
        assert_eq!(w.countdown().unwrap().remaining(), 15);
        w.advance(Duration::from_millis(999));
        assert_eq!(w.countdown().unwrap().remaining(), 15);
    }

    #[test]
    fn reset_mid_countdown_cancels_timer() {
        let (mut w, cues) = workout();
        w.start();
        w.advance(Duration::from_millis(1_900));
        assert_eq!(w.countdown().unwrap().remaining(), 2);

        w.reset();
        assert_eq!(w.stage(), Stage::Start);
        assert!(w.countdown().is_none());
        cues.drain();

        w.start();
        w.advance(Duration::from_millis(200));
        assert_eq!(w.countdown().unwrap().remaining(), 3);
        assert!(cues.cues().is_empty());
    }

    #[test]
    fn empty_catalog_goes_straight_to_check() {
        let mut w = Workout::new(Vec::new(), Box::new(RecordingCueSink::new()));
        to_pulse_before_input(&mut w);
        w.submit_pulse("60");
        assert_eq!(w.stage(), Stage::SessionCheck);
    }

    #[test]
    fn export_record_only_at_summary() {
        let (mut w, _) = workout();
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert!(w.export_record(date).is_none());

        to_pulse_before_input(&mut w);
        w.submit_pulse("72");
        finish_round(&mut w);
        w.decide(true);
        finish_round(&mut w);
        w.decide(false);
        ticks(&mut w, 18);
        w.submit_pulse("110");

        let record = w.export_record(date).unwrap();
        assert_eq!(record.pulse_before, 72);
        assert_eq!(record.pulse_after, 110);
        assert_eq!(record.session_label, "2 Sessions");
    }

    #[test]
    fn start_stamps_the_session_clock() {
        let (mut w, _) = workout();
        // idle on the start screen for an hour
        w.session.started_at = chrono::Local::now() - chrono::Duration::hours(1);
        assert!(w.start());
        let since_start = chrono::Local::now() - w.session().started_at;
        assert!(since_start < chrono::Duration::seconds(5));
    }

    /// Asserts which countdown may run for the current stage
    fn assert_timer_ownership(w: &Workout) {
        let stage = w.stage();
        let prep = matches!(
            stage,
            Stage::PulseBeforePrep | Stage::ExercisePrep | Stage::PulseAfterPrep
        );
        let active = matches!(
            stage,
            Stage::PulseBeforeCountdown | Stage::PulseAfterCountdown | Stage::ExerciseTimer
        );
        assert_eq!(w.prep_countdown_active(), prep, "prep countdown in {stage}");
        assert_eq!(w.active_countdown_active(), active, "active countdown in {stage}");
        assert_eq!(w.countdown().is_some(), prep || active, "countdown in {stage}");
    }

    #[test]
    fn exactly_one_countdown_per_timed_stage() {
        let (mut w, _) = workout();
        let mut seen = std::collections::HashSet::new();
        let mut step = |w: &mut Workout| {
            assert_timer_ownership(w);
            seen.insert(w.stage());
        };

        step(&mut w);
        w.start();
        for _ in 0..18 {
            step(&mut w);
            w.tick();
        }
        step(&mut w);
        w.submit_pulse("72");

        while w.stage() != Stage::SessionCheck {
            step(&mut w);
            if w.countdown().is_some() {
                w.tick();
            } else {
                w.continue_exercise();
            }
        }
        step(&mut w);
        w.decide(false);

        for _ in 0..18 {
            step(&mut w);
            w.tick();
        }
        step(&mut w);
        w.submit_pulse("95");
        step(&mut w);

        assert_eq!(w.stage(), Stage::FinalSummary);
        assert_eq!(seen.len(), 12, "visited {seen:?}");
    }
}
