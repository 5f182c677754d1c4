//! Interactive terminal preview of a tour.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};

use super::page_view::PageView;
use super::terminal_guard::{install_panic_hook, TerminalGuard};
use crate::controller::Phase;
use crate::session::{Action, TourSession};
use crate::state::StateStore;

const KEY_HELP: &str = "n/→ next  b/← back  s/esc skip  r restart  q quit";

/// What a key press asks the preview to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntent {
    Tour(Action),
    Quit,
}

pub fn key_intent(code: KeyCode) -> Option<KeyIntent> {
    match code {
        KeyCode::Char('n') | KeyCode::Right | KeyCode::Enter => Some(KeyIntent::Tour(Action::Next)),
        KeyCode::Char('b') | KeyCode::Left => Some(KeyIntent::Tour(Action::Back)),
        KeyCode::Char('s') | KeyCode::Esc => Some(KeyIntent::Tour(Action::Skip)),
        KeyCode::Char('r') => Some(KeyIntent::Tour(Action::Start)),
        KeyCode::Char('q') => Some(KeyIntent::Quit),
        _ => None,
    }
}

pub fn describe_phase(phase: &Phase) -> String {
    match phase {
        Phase::Idle => "idle".to_string(),
        Phase::AwaitingPage { step, url } => format!("step {} -> {url}", step + 1),
        Phase::Showing { step, attempt: 0 } => format!("step {}", step + 1),
        Phase::Showing { step, attempt } => {
            format!("step {} (waiting for target, attempt {attempt})", step + 1)
        }
        Phase::Finished { skipped: true } => "skipped".to_string(),
        Phase::Finished { skipped: false } => "finished".to_string(),
    }
}

pub struct Preview<S: StateStore + Clone + 'static> {
    session: TourSession<S>,
    tick: Duration,
    should_quit: bool,
}

impl<S: StateStore + Clone + 'static> Preview<S> {
    pub fn new(session: TourSession<S>, tick: Duration) -> Self {
        Self {
            session,
            tick,
            should_quit: false,
        }
    }

    pub fn session(&self) -> &TourSession<S> {
        &self.session
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run(&mut self) -> Result<()> {
        install_panic_hook();
        let _guard = TerminalGuard::new()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

        // Start the tour unless the page load is about to resume one
        if self.session.controller().tasks().is_empty()
            && matches!(self.session.controller().phase(), Phase::Idle)
        {
            self.session.apply(Action::Start);
        }

        while !self.should_quit {
            terminal.draw(|f| self.render(f))?;

            if event::poll(self.tick)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
            self.session.tick(self.tick);
        }

        terminal.show_cursor()?;
        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match key_intent(code) {
            Some(KeyIntent::Quit) => self.should_quit = true,
            Some(KeyIntent::Tour(action)) => self.session.apply(action),
            None => {}
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(frame.area());

        PageView::new(
            self.session.document(),
            self.session.scene(),
            self.session.viewport(),
        )
        .render(frame, chunks[0]);

        let controller = self.session.controller();
        let status = Line::from(vec![
            Span::styled(
                self.session.current_url().to_string(),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  "),
            Span::styled(
                describe_phase(controller.phase()),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw(format!("  t={}ms  ", self.session.clock().now().as_millis())),
            Span::styled(KEY_HELP, Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(status), chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{StepDescriptor, TourFile};
    use crate::config::Config;
    use crate::layout::Size;
    use crate::render::Renderer;
    use crate::state::MemoryStore;

    fn preview() -> Preview<MemoryStore> {
        let tour = TourFile {
            steps: vec![
                StepDescriptor::new("index.html", None, "Welcome"),
                StepDescriptor::new("index.html", None, "Bye"),
            ],
            pages: Vec::new(),
        };
        let session =
            TourSession::open(&tour, &Config::default(), MemoryStore::default(), None).unwrap();
        Preview::new(session, Duration::from_millis(25))
    }

    #[test]
    fn test_key_intents() {
        assert_eq!(key_intent(KeyCode::Enter), Some(KeyIntent::Tour(Action::Next)));
        assert_eq!(key_intent(KeyCode::Left), Some(KeyIntent::Tour(Action::Back)));
        assert_eq!(key_intent(KeyCode::Esc), Some(KeyIntent::Tour(Action::Skip)));
        assert_eq!(key_intent(KeyCode::Char('r')), Some(KeyIntent::Tour(Action::Start)));
        assert_eq!(key_intent(KeyCode::Char('q')), Some(KeyIntent::Quit));
        assert_eq!(key_intent(KeyCode::Char('x')), None);
    }

    #[test]
    fn test_keys_drive_the_tour() {
        let mut preview = preview();
        preview.handle_key(KeyCode::Char('r'));
        assert_eq!(preview.session().controller().phase().showing_step(), Some(0));

        preview.handle_key(KeyCode::Right);
        assert_eq!(preview.session().controller().phase().showing_step(), Some(1));

        preview.handle_key(KeyCode::Esc);
        assert_eq!(preview.session().controller().phase(), &Phase::Idle);
        assert!(!preview.should_quit());

        preview.handle_key(KeyCode::Char('q'));
        assert!(preview.should_quit());
    }

    #[test]
    fn test_page_drawn_in_renderer_viewport() {
        let mut config = Config::default();
        config.preview.viewport_width = 640;
        config.preview.viewport_height = 480;
        let tour = TourFile {
            steps: vec![StepDescriptor::new("index.html", None, "Welcome")],
            pages: Vec::new(),
        };
        let session = TourSession::open(&tour, &config, MemoryStore::default(), None).unwrap();
        let mut preview = Preview::new(session, Duration::from_millis(25));
        preview.handle_key(KeyCode::Char('r'));

        let session = preview.session();
        assert_eq!(session.viewport(), Size::new(640, 480));
        assert_eq!(
            session.controller().renderer().viewport(),
            session.viewport()
        );
        let popover = session.scene().popover.as_ref().unwrap();
        assert!(popover.size.width <= 640);
    }

    #[test]
    fn test_describe_phase() {
        assert_eq!(describe_phase(&Phase::Idle), "idle");
        assert_eq!(
            describe_phase(&Phase::Showing { step: 1, attempt: 3 }),
            "step 2 (waiting for target, attempt 3)"
        );
        assert_eq!(
            describe_phase(&Phase::AwaitingPage {
                step: 0,
                url: "https://site.local/b.html?bp_tour_step=0".to_string()
            }),
            "step 1 -> https://site.local/b.html?bp_tour_step=0"
        );
    }
}
