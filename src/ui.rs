pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

use crate::{app::App, session::MAX_ROUNDS};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const HEADER_HEIGHT: u16 = 3;

pub(crate) const ACCENT: Color = Color::Rgb(249, 115, 22);
pub(crate) const ALERT: Color = Color::Rgb(220, 38, 38);

pub(crate) fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub(crate) fn accent_bold() -> Style {
    bold().fg(ACCENT)
}

pub(crate) fn dim_italic() -> Style {
    Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::ITALIC | Modifier::DIM)
}

/// Render the whole app into a frame
pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(1), // status line
            ])
            .split(area);

        render_header(self, chunks[0], buf);

        let body = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([Constraint::Min(0)])
            .split(chunks[1])[0];

        screen::current_screen(self).render(self, body, buf);

        if let Some(status) = &self.status {
            Paragraph::new(Span::styled(status.as_str(), dim_italic()))
                .alignment(Alignment::Center)
                .render(chunks[2], buf);
        }
    }
}

fn render_header(app: &App, area: Rect, buf: &mut Buffer) {
    let title = Line::from(vec![
        Span::styled("PULSE", accent_bold()),
        Span::styled("POWER", bold().fg(ALERT)),
        Span::raw("   "),
        Span::styled(
            format!(
                "Cycle {}/{}",
                app.workout.session().session_count(),
                MAX_ROUNDS
            ),
            accent_bold(),
        ),
    ]);

    Paragraph::new(title)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM))
        .render(area, buf);
}

/// Vertically centre `height` rows inside `area`
pub(crate) fn centered(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    let top = (area.height - height) / 2;
    Rect::new(area.x, area.y + top, area.width, height)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::access::OpenGate;
    use crate::audio::RecordingCueSink;
    use crate::exercise::default_catalog;
    use crate::workout::Workout;

    pub(crate) fn test_app() -> App {
        let workout = Workout::new(default_catalog(), Box::new(RecordingCueSink::new()));
        App::new(workout, Box::new(OpenGate))
    }

    pub(crate) fn render_to_string(app: &App, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn header_shows_cycle() {
        let rendered = render_to_string(&test_app(), 80, 24);
        assert!(rendered.contains("PULSE"));
        assert!(rendered.contains("Cycle 1/3"));
    }

    #[test]
    fn status_line_is_rendered() {
        let mut app = test_app();
        app.status = Some("performance uploaded".to_string());
        let rendered = render_to_string(&app, 80, 24);
        assert!(rendered.contains("performance uploaded"));
    }

    #[test]
    fn tiny_areas_do_not_panic() {
        let app = test_app();
        for (w, h) in [(1, 1), (10, 3), (20, 5), (200, 60)] {
            render_to_string(&app, w, h);
        }
    }

    #[test]
    fn centered_clamps_to_area() {
        let area = Rect::new(0, 0, 10, 4);
        assert_eq!(centered(area, 2), Rect::new(0, 1, 10, 2));
        assert_eq!(centered(area, 10), area);
    }

    #[test]
    fn draw_into_test_backend() {
        use ratatui::{backend::TestBackend, Terminal};

        let app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(&app, f)).unwrap();
        let rendered = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>();
        assert!(rendered.contains("MEASURE PULSE"));
    }
}
