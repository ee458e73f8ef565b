use std::time::Duration;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};
use webbrowser::Browser;

use crate::{
    access::BILLING_DOCS_URL,
    app::App,
    countdown::PULSE_WINDOW_SECS,
    session::MAX_ROUNDS,
    ui::{accent_bold, bold, centered, dim_italic, ACCENT, ALERT},
    workout::{Stage, State},
};

/// A UI Screen boundary: renders one group of stages
pub trait Screen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
}

/// Shown until the access gate reports a key
pub struct GateScreen;

impl Screen for GateScreen {
    fn render(&self, _app: &App, area: Rect, buf: &mut Buffer) {
        let text = vec![
            Line::from(Span::styled("ELITE ACCESS REQUIRED", accent_bold())),
            Line::from(""),
            Line::from("Exercise illustrations need an API key from a paid project."),
            Line::from(Span::styled(
                format!("billing: {BILLING_DOCS_URL}"),
                dim_italic(),
            )),
            Line::from(""),
            Line::from(Span::styled(
                if Browser::is_available() {
                    "(k) select key / (enter) check again / (esc)ape"
                } else {
                    "(enter) check again / (esc)ape"
                },
                Style::default().add_modifier(Modifier::ITALIC),
            )),
        ];
        let height = text.len() as u16 + 2;

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(ACCENT)),
            )
            .render(centered(area, height), buf);
    }
}

pub struct StartScreen;

impl Screen for StartScreen {
    fn render(&self, _app: &App, area: Rect, buf: &mut Buffer) {
        let text = vec![
            Line::from(Span::styled("UNLEASH THE BEAST", accent_bold())),
            Line::from(Span::styled(
                "Dynamic tracking and peak performance monitoring.",
                dim_italic(),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "[ MEASURE PULSE ]",
                bold().fg(Color::Black).bg(Color::White),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "(enter) initialize session / (esc)ape",
                Style::default().add_modifier(Modifier::ITALIC),
            )),
        ];
        let height = text.len() as u16;
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .render(centered(area, height), buf);
    }
}

/// Any preparation countdown: "GET READY" with the seconds left
pub struct PrepScreen;

impl PrepScreen {
    fn message(app: &App) -> String {
        match (app.stage(), app.workout.current_exercise()) {
            (Stage::ExercisePrep, Some(exercise)) => format!("Preparing {}...", exercise.name),
            _ => "Preparing Bio-Scan...".to_string(),
        }
    }
}

impl Screen for PrepScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let remaining = app.workout.countdown().map_or(0, |cd| cd.remaining());
        let text = vec![
            Line::from(Span::styled("GET READY", accent_bold())),
            Line::from(""),
            Line::from(Span::styled(
                remaining.to_string(),
                bold().add_modifier(Modifier::SLOW_BLINK),
            )),
            Line::from(""),
            Line::from(Span::styled(Self::message(app), dim_italic())),
        ];
        let height = text.len() as u16;
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .render(centered(area, height), buf);
    }
}

/// Pulse measurement window
pub struct PulseCountdownScreen;

impl Screen for PulseCountdownScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let area = centered(area, 7);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(2),
            ])
            .split(area);

        Paragraph::new(Span::styled("DON'T MOVE", bold().fg(ALERT)))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        if let Some(cd) = app.workout.countdown() {
            Gauge::default()
                .block(Block::default().borders(Borders::ALL).title("Seconds Left"))
                .gauge_style(Style::default().fg(ACCENT))
                .ratio(cd.ratio_of(PULSE_WINDOW_SECS))
                .label(format!("{}s", cd.remaining()))
                .render(chunks[1], buf);
        }

        Paragraph::new(Span::styled("Scanning Bio-Data...", dim_italic()))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }
}

/// Typed pulse entry
pub struct PulseInputScreen;

impl Screen for PulseInputScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let reading = if app.pulse_input.is_empty() {
            Span::styled("00", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(app.pulse_input.as_str(), bold())
        };
        let text = vec![
            Line::from(Span::styled("DATA ENTRY", bold())),
            Line::from(Span::styled(
                format!("Enter heart beats detected in {PULSE_WINDOW_SECS}s"),
                accent_bold(),
            )),
            Line::from(""),
            Line::from(vec![reading, Span::styled("  BPM", accent_bold())]),
            Line::from(""),
            Line::from(Span::styled(
                "(enter) log pulse / (backspace) correct",
                Style::default().add_modifier(Modifier::ITALIC),
            )),
        ];
        let height = text.len() as u16 + 2;
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(ACCENT)),
            )
            .render(centered(area, height), buf);
    }
}

/// Exercise card, with the timer while one runs
pub struct ExerciseScreen;

impl Screen for ExerciseScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let Some(exercise) = app.workout.current_exercise() else {
            return;
        };
        let position = app.workout.state().exercise_index().map_or(0, |i| i + 1);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // name + reps
                Constraint::Length(3), // timer or continue
                Constraint::Min(2),    // description
                Constraint::Length(1), // image
            ])
            .split(area);

        let title = Line::from(vec![
            Span::styled(exercise.name.to_uppercase(), bold()),
            Span::raw("  "),
            Span::styled(format!(" {} ", exercise.reps), bold().bg(ACCENT)),
            Span::styled(
                format!("   {}/{}", position, app.workout.exercises().len()),
                dim_italic(),
            ),
        ]);
        Paragraph::new(title).render(chunks[0], buf);

        match app.workout.state() {
            State::ExerciseTimer { countdown, .. } => {
                let total = app.workout.active_total_secs().unwrap_or(0);
                Gauge::default()
                    .block(Block::default().borders(Borders::ALL).title("Timer"))
                    .gauge_style(Style::default().fg(ACCENT))
                    .ratio(countdown.ratio_of(total))
                    .label(format!("{}s", countdown.remaining()))
                    .render(chunks[1], buf);
            }
            _ => {
                Paragraph::new(Span::styled(
                    "(enter) set complete",
                    bold().fg(Color::Black).bg(Color::White),
                ))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL))
                .render(chunks[1], buf);
            }
        }

        Paragraph::new(exercise.description.as_str())
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);

        let image = match app.images.image() {
            Some(image) => Span::styled(image.to_string(), dim_italic()),
            None if app.images.is_loading() => Span::styled("loading visual...", dim_italic()),
            None => Span::raw(""),
        };
        Paragraph::new(image).render(chunks[3], buf);
    }
}

/// Repeat-or-stop decision
pub struct SessionCheckScreen;

impl Screen for SessionCheckScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let count = app.workout.session().session_count();
        let repeat_style = if app.workout.can_repeat() {
            bold().fg(Color::White).bg(ACCENT)
        } else {
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT)
        };

        let prompt = if app.workout.can_repeat() {
            format!("Push for Session {}?", count + 1)
        } else {
            format!("Round limit reached: {count} of {MAX_ROUNDS} done")
        };

        let text = vec![
            Line::from(Span::styled("VOLTAGE CHECK", bold())),
            Line::from(Span::styled(prompt, dim_italic())),
            Line::from(""),
            Line::from(vec![
                Span::styled(" (y) ONE MORE ", repeat_style),
                Span::raw("    "),
                Span::styled(" (n) ENOUGH ", bold().fg(Color::Black).bg(Color::White)),
            ]),
        ];
        let height = text.len() as u16;
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .render(centered(area, height), buf);
    }
}

pub struct SummaryScreen;

impl SummaryScreen {
    fn reading(value: Option<u32>) -> String {
        value.map_or_else(|| "-".to_string(), |v| v.to_string())
    }
}

/// "12 min 05 s" style workout length
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s} s"),
        (0, m, s) => format!("{m} min {s:02} s"),
        (h, m, _) => format!("{h} h {m:02} min"),
    }
}

impl Screen for SummaryScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let session = app.workout.session();
        let area = centered(area, 11);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(4),
                Constraint::Length(2),
                Constraint::Length(3),
            ])
            .split(area);

        Paragraph::new(Span::styled("ELITE LEVEL", accent_bold()))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(chunks[1]);

        let tiles = [
            ("Baseline", Self::reading(session.pulse_before()), Color::White),
            ("Post-Ex", Self::reading(session.pulse_after()), ALERT),
            ("Rounds", session.session_count().to_string(), ACCENT),
        ];
        for ((label, value, color), column) in tiles.into_iter().zip(columns.iter()) {
            Paragraph::new(Span::styled(value, bold().fg(color)))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(label))
                .render(*column, buf);
        }

        if let Some(elapsed) = app.elapsed() {
            Paragraph::new(Span::styled(
                format!("workout time {}", format_elapsed(elapsed)),
                dim_italic(),
            ))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
        }

        let legend = if app.exported {
            "(r)estart / (esc)ape"
        } else {
            "(u)pload performance / (r)estart / (esc)ape"
        };
        Paragraph::new(Span::styled(
            legend,
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(app: &App) -> Box<dyn Screen> {
    if !app.gate_open {
        return Box::new(GateScreen);
    }
    match app.stage() {
        Stage::Start => Box::new(StartScreen),
        Stage::PulseBeforePrep | Stage::ExercisePrep | Stage::PulseAfterPrep => Box::new(PrepScreen),
        Stage::PulseBeforeCountdown | Stage::PulseAfterCountdown => Box::new(PulseCountdownScreen),
        Stage::PulseBeforeInput | Stage::PulseAfterInput => Box::new(PulseInputScreen),
        Stage::ExerciseTimer | Stage::ExerciseLoop => Box::new(ExerciseScreen),
        Stage::SessionCheck => Box::new(SessionCheckScreen),
        Stage::FinalSummary => Box::new(SummaryScreen),
    }
}
