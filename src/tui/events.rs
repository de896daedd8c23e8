use crossterm::event::{Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Application events
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input event
    Key(KeyEvent),

    /// Terminal resize event
    Resize(u16, u16),

    /// Periodic tick event
    Tick,
}

/// Event handler for managing input events
pub struct EventHandler {
    /// Event receiver channel
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Create a new event handler and start reading terminal input.
    ///
    /// Input is read on a blocking thread; a tick is sent whenever no input
    /// arrives within `tick_interval`.
    pub fn new(tick_interval: Duration) -> Self {
        let (input, receiver) = mpsc::unbounded_channel();
        tokio::task::spawn_blocking(move || loop {
            if input.is_closed() {
                break;
            }
            let event = match crossterm::event::poll(tick_interval) {
                Ok(true) => match crossterm::event::read() {
                    Ok(event) => Self::convert_crossterm_event(event),
                    Err(e) => {
                        warn!("Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => Some(Event::Tick),
                Err(e) => {
                    warn!("Failed to poll terminal events: {}", e);
                    break;
                }
            };
            if let Some(event) = event {
                if input.send(event).is_err() {
                    break;
                }
            }
        });

        Self::with_receiver(receiver)
    }

    /// An event handler fed by some other sender
    pub fn with_receiver(receiver: mpsc::UnboundedReceiver<Event>) -> Self {
        Self { receiver }
    }

    /// Get the next event
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Convert crossterm events to application events
    fn convert_crossterm_event(event: CrosstermEvent) -> Option<Event> {
        match event {
            CrosstermEvent::Key(key_event) => Some(Event::Key(key_event)),
            CrosstermEvent::Resize(width, height) => Some(Event::Resize(width, height)),
            _ => None,
        }
    }
}
