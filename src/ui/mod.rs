// Terminal front end. Holds no simulation state of its own: it renders the
// latest snapshot and turns keystrokes into session events.

pub mod widgets;

use crate::simulation::{Dashboard, DashboardSnapshot, Event, Session};
use anyhow::Result;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const INPUT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Submit { content: String, encrypted: bool },
    Quit,
}

#[derive(Debug)]
pub struct AppState {
    pub input: String,
    pub encrypted: bool,
    pub mesh_active: bool,
    pub snapshot: Arc<DashboardSnapshot>,
    /// Canvas size in braille dots, as of the last draw.
    canvas_dots: Option<(u16, u16)>,
    pending_resize: Option<(f64, f64)>,
}

impl AppState {
    pub fn new(snapshot: Arc<DashboardSnapshot>) -> Self {
        Self {
            input: String::new(),
            encrypted: true,
            mesh_active: true,
            snapshot,
            canvas_dots: None,
            pending_resize: None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
            KeyCode::Tab => {
                self.encrypted = !self.encrypted;
                None
            }
            KeyCode::F(2) => {
                self.mesh_active = !self.mesh_active;
                None
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Enter => {
                // blank input stays put, same as a disabled send button
                if self.input.trim().is_empty() {
                    return None;
                }
                let content = std::mem::take(&mut self.input);
                Some(Action::Submit {
                    content,
                    encrypted: self.encrypted,
                })
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                None
            }
            _ => None,
        }
    }

    /// Records the canvas size seen by the last draw. A change means the
    /// topology needs rebuilding for the new surface.
    pub(crate) fn observe_canvas(&mut self, cols: u16, rows: u16) {
        let dots = (cols.saturating_mul(2), rows.saturating_mul(4));
        if self.canvas_dots != Some(dots) && dots.0 > 0 && dots.1 > 0 {
            self.canvas_dots = Some(dots);
            self.pending_resize = Some((dots.0 as f64, dots.1 as f64));
        }
    }

    pub fn take_resize(&mut self) -> Option<Event> {
        self.pending_resize
            .take()
            .map(|(width, height)| Event::Resize { width, height })
    }
}

type Term = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Leaves raw mode and the alternate screen before the previous hook
/// prints the panic report.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        previous(info);
    }));
}

/// Runs the dashboard in the terminal until the user quits, then tears the
/// session down and returns its final state.
pub async fn run(session: Session) -> Result<Dashboard> {
    install_panic_hook();
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &session).await;
    restore_terminal(&mut terminal)?;
    result?;
    session.shutdown().await
}

async fn event_loop(terminal: &mut Term, session: &Session) -> Result<()> {
    let mut snapshots = session.subscribe();
    let mut app = AppState::new(snapshots.borrow_and_update().clone());

    let stop_input = CancellationToken::new();
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    let input_stop = stop_input.clone();
    let input_handle = tokio::task::spawn_blocking(move || {
        while !input_stop.is_cancelled() {
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if input_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Ok(false) => {}
                Err(_) => break,
            }
        }
    });

    let result = loop {
        if let Err(e) = draw(terminal, &mut app) {
            break Err(e);
        }
        if let Some(resize) = app.take_resize() {
            session.send(resize);
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                app.snapshot = snapshots.borrow_and_update().clone();
            }
            input = input_rx.recv() => match input {
                Some(TermEvent::Key(key)) => match app.handle_key(key) {
                    Some(Action::Quit) => {
                        info!("Quit requested");
                        break Ok(());
                    }
                    Some(Action::Submit { content, encrypted }) => {
                        debug!("Submitting {} chars", content.chars().count());
                        session.send(Event::Submit { content, encrypted });
                    }
                    None => {}
                },
                Some(TermEvent::Resize(cols, rows)) => {
                    debug!("Terminal resized to {}x{}", cols, rows);
                }
                Some(_) => {}
                None => break Ok(()),
            },
        }
    };

    stop_input.cancel();
    let _ = input_handle.await;
    result
}

fn draw(terminal: &mut Term, app: &mut AppState) -> Result<()> {
    terminal.draw(|f| widgets::draw(f, app))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimConfig;

    fn app() -> AppState {
        let dashboard = Dashboard::new(SimConfig::default().with_seed(1));
        AppState::new(Arc::new(dashboard.snapshot(Duration::ZERO)))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn panic_hook_still_reports() {
        use std::sync::atomic::{AtomicBool, Ordering};
        static REPORTED: AtomicBool = AtomicBool::new(false);

        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| REPORTED.store(true, Ordering::SeqCst)));
        install_panic_hook();

        let caught: std::thread::Result<()> = std::panic::catch_unwind(|| panic!("draw failed"));

        let _ = std::panic::take_hook();
        std::panic::set_hook(original);
        assert!(caught.is_err());
        assert!(REPORTED.load(Ordering::SeqCst));
    }

    fn type_text(app: &mut AppState, text: &str) {
        for c in text.chars() {
            assert!(app.handle_key(press(KeyCode::Char(c))).is_none());
        }
    }

    #[test]
    fn enter_submits_and_clears() {
        let mut app = app();
        type_text(&mut app, "hello");
        let action = app.handle_key(press(KeyCode::Enter));
        assert_eq!(
            action,
            Some(Action::Submit {
                content: "hello".into(),
                encrypted: true
            })
        );
        assert!(app.input.is_empty());
    }

    #[test]
    fn blank_enter_keeps_input() {
        let mut app = app();
        type_text(&mut app, "   ");
        assert!(app.handle_key(press(KeyCode::Enter)).is_none());
        assert_eq!(app.input, "   ");
    }

    #[test]
    fn tab_toggles_encryption() {
        let mut app = app();
        app.handle_key(press(KeyCode::Tab));
        type_text(&mut app, "x");
        assert_eq!(
            app.handle_key(press(KeyCode::Enter)),
            Some(Action::Submit {
                content: "x".into(),
                encrypted: false
            })
        );
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        assert_eq!(app.handle_key(press(KeyCode::Esc)), Some(Action::Quit));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(ctrl_c), Some(Action::Quit));
        assert!(app.input.is_empty());
    }

    #[test]
    fn canvas_change_requests_resize_once() {
        let mut app = app();
        app.observe_canvas(40, 20);
        assert_eq!(
            app.take_resize(),
            Some(Event::Resize {
                width: 80.0,
                height: 80.0
            })
        );
        app.observe_canvas(40, 20);
        assert!(app.take_resize().is_none());
    }
}
