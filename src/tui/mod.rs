//! Terminal story previewer built on ratatui

mod app;
pub mod components;
mod events;
mod keys;

pub use app::App;
pub use events::{Event, EventHandler};
pub use keys::{KeyBinding, KeyMap};

use anyhow::Result;
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::{Backend as RatatuiBackend, CrosstermBackend};
use ratatui::Terminal;
use std::io;
use std::time::Duration;

pub type Backend = CrosstermBackend<io::Stdout>;
pub type Frame<'a> = ratatui::Frame<'a>;

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Best-effort restore without a terminal handle, for the panic hook
pub fn leave_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
}

/// Main TUI entry point
pub async fn run(mut app: App, tick_ms: u64) -> Result<()> {
    let mut terminal = init_terminal()?;
    let mut event_handler = EventHandler::new(Duration::from_millis(tick_ms));

    let result = run_app(&mut terminal, &mut app, &mut event_handler).await;

    restore_terminal(&mut terminal)?;
    result
}

/// Main application loop
async fn run_app<B: RatatuiBackend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_handler: &mut EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        match event_handler.next().await {
            Some(event) => {
                if app.handle_event(event)? {
                    break; // Exit requested
                }
            }
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::story::{PageDatabase, StoryPageRecord};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_loop_exits_after_confirmed_quit() {
        let mut record = StoryPageRecord::new();
        record.push("Only", "text");
        let mut app = App::new(Config::default(), PageDatabase::in_memory().unwrap(), 1, record, 1);

        let (sender, receiver) = mpsc::unbounded_channel();
        let mut events = EventHandler::with_receiver(receiver);
        for code in [KeyCode::Char('q'), KeyCode::BackTab, KeyCode::Enter] {
            sender.send(Event::Key(KeyEvent::new(code, KeyModifiers::NONE))).unwrap();
        }
        // Never reached
        sender.send(Event::Tick).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        run_app(&mut terminal, &mut app, &mut events).await.unwrap();
        assert!(app.dialogs().is_empty());
    }
}
