use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{info, warn};

use crate::access::KeyGate;
use crate::export::ExportSink;
use crate::imagery::{spawn_resolve, ImageResolver, ImageSlot};
use crate::runtime::AppEvent;
use crate::workout::{Stage, Workout};

/// Longest pulse reading the input field accepts
const MAX_PULSE_DIGITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything the TUI needs: the controller plus the side tasks around it
pub struct App {
    pub workout: Workout,
    pub pulse_input: String,
    pub images: ImageSlot,
    pub gate_open: bool,
    pub status: Option<String>,
    pub exported: bool,
    pub finished_at: Option<DateTime<Local>>,
    gate: Box<dyn KeyGate>,
    resolver: Option<(Arc<dyn ImageResolver>, Sender<AppEvent>)>,
    sinks: Vec<Box<dyn ExportSink>>,
    last_step: Instant,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("workout", &self.workout)
            .field("pulse_input", &self.pulse_input)
            .field("images", &self.images)
            .field("gate_open", &self.gate_open)
            .field("exported", &self.exported)
            .finish()
    }
}

impl App {
    pub fn new(workout: Workout, gate: Box<dyn KeyGate>) -> Self {
        let gate_open = gate.has_key();
        Self {
            workout,
            pulse_input: String::new(),
            images: ImageSlot::default(),
            gate_open,
            status: None,
            exported: false,
            finished_at: None,
            gate,
            resolver: None,
            sinks: Vec::new(),
            last_step: Instant::now(),
        }
    }

    /// Resolve exercise images on background threads, posting into `tx`
    pub fn with_resolver(mut self, resolver: Arc<dyn ImageResolver>, tx: Sender<AppEvent>) -> Self {
        self.resolver = Some((resolver, tx));
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn ExportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn stage(&self) -> Stage {
        self.workout.stage()
    }

    pub fn on_event(&mut self, event: AppEvent) -> Flow {
        self.on_event_at(event, Instant::now())
    }

    /// Handle one event; `now` drives the countdowns
    pub fn on_event_at(&mut self, event: AppEvent, now: Instant) -> Flow {
        let elapsed = now.saturating_duration_since(self.last_step);
        self.last_step = now;
        // time passes before the event lands, so a countdown started by this
        // event begins from zero
        self.advance(elapsed);

        match event {
            AppEvent::Tick | AppEvent::Resize => Flow::Continue,
            AppEvent::ImageResolved { exercise_id, image } => {
                self.images.accept(&exercise_id, image);
                Flow::Continue
            }
            AppEvent::Key(key) => self.on_key(key),
        }
    }

    pub fn advance(&mut self, elapsed: Duration) {
        if self.workout.advance(elapsed) {
            self.after_transition();
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return Flow::Quit;
        }

        if !self.gate_open {
            self.on_gate_key(key.code);
            return Flow::Continue;
        }

        let changed = match (self.stage(), key.code) {
            (Stage::Start, KeyCode::Enter | KeyCode::Char(' ')) => self.workout.start(),
            (Stage::PulseBeforeInput | Stage::PulseAfterInput, code) => self.on_input_key(code),
            (Stage::ExerciseLoop, KeyCode::Enter | KeyCode::Char(' ')) => {
                self.workout.continue_exercise()
            }
            (Stage::SessionCheck, KeyCode::Char('y') | KeyCode::Char('1')) => {
                self.workout.decide(true)
            }
            (Stage::SessionCheck, KeyCode::Char('n') | KeyCode::Char('2')) => {
                self.workout.decide(false)
            }
            (Stage::FinalSummary, KeyCode::Char('u')) => {
                self.export();
                false
            }
            (Stage::FinalSummary, KeyCode::Char('r')) => {
                self.restart();
                false
            }
            _ => false,
        };

        if changed {
            self.after_transition();
        }
        Flow::Continue
    }

    fn on_gate_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('k') => match self.gate.select_key() {
                Ok(()) => {
                    self.gate_open = true;
                    self.status = None;
                }
                Err(e) => {
                    warn!(error = %e, "key selection failed");
                    self.status = Some(e.to_string());
                }
            },
            KeyCode::Enter => {
                if self.gate.has_key() {
                    self.gate_open = true;
                    self.status = None;
                } else {
                    self.status = Some("no key found yet".to_string());
                }
            }
            _ => {}
        }
    }

    fn on_input_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.pulse_input.len() < MAX_PULSE_DIGITS {
                    self.pulse_input.push(c);
                }
                false
            }
            KeyCode::Backspace => {
                self.pulse_input.pop();
                false
            }
            KeyCode::Enter => {
                let accepted = self.workout.submit_pulse(&self.pulse_input);
                if accepted {
                    self.pulse_input.clear();
                }
                accepted
            }
            _ => false,
        }
    }

    /// Keep side tasks in step with the controller's new state
    fn after_transition(&mut self) {
        match self.workout.current_exercise() {
            Some(exercise) => {
                if self.images.request(&exercise.id) {
                    if let Some((resolver, tx)) = &self.resolver {
                        spawn_resolve(Arc::clone(resolver), exercise.clone(), tx.clone());
                    }
                }
            }
            None => self.images.clear(),
        }

        if self.stage() == Stage::FinalSummary && self.finished_at.is_none() {
            self.finished_at = Some(Local::now());
            info!(
                rounds = self.workout.session().session_count(),
                "session complete"
            );
        }
    }

    /// Hand the finished session to every sink, once
    pub fn export(&mut self) {
        if self.exported {
            return;
        }
        let Some(record) = self.workout.export_record(Local::now().date_naive()) else {
            return;
        };
        self.exported = true;

        let mut failed = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.export(&record) {
                warn!(sink = sink.name(), error = %e, "export failed");
                failed.push(sink.name());
            }
        }
        self.status = Some(if failed.is_empty() {
            "performance uploaded".to_string()
        } else {
            format!("export failed: {}", failed.join(", "))
        });
    }

    /// Throw the session away and go back to the start screen
    pub fn restart(&mut self) {
        self.workout.reset();
        self.pulse_input.clear();
        self.images.clear();
        self.status = None;
        self.exported = false;
        self.finished_at = None;
    }

    /// Workout length for the summary screen
    pub fn elapsed(&self) -> Option<Duration> {
        let finished = self.finished_at?;
        (finished - self.workout.session().started_at).to_std().ok()
    }
}
