use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tracing::{debug, error, info};

use super::components::dialogs::{dialog_ids, DialogHandle, DialogInit, DialogLayer, DialogManager, DialogResponse};
use super::events::Event;
use super::keys::KeyMap;
use super::Frame;
use crate::config::Config;
use crate::markup;
use crate::story::{PageDatabase, PageId, StoryId, StoryPageRecord};
use crate::version;

/// What a dialog was opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogPurpose {
    Quit,
    Notice,
    DeletePage(PageId),
}

/// Story previewer state
pub struct App {
    config: Config,
    db: PageDatabase,
    story: StoryId,
    record: StoryPageRecord,
    current: PageId,
    /// Pages visited before the current one
    history: Vec<PageId>,
    scroll: u16,
    dialogs: DialogManager,
    /// Dialogs whose outcome the app still waits for
    pending: Vec<(DialogPurpose, DialogHandle)>,
    keys: KeyMap,
    status: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, db: PageDatabase, story: StoryId, record: StoryPageRecord, page: PageId) -> Self {
        Self {
            config,
            db,
            story,
            record,
            current: page,
            history: Vec::new(),
            scroll: 0,
            dialogs: DialogManager::new(),
            pending: Vec::new(),
            keys: KeyMap::default(),
            status: None,
            should_quit: false,
        }
    }

    pub fn current_page(&self) -> PageId {
        self.current
    }

    pub fn record(&self) -> &StoryPageRecord {
        &self.record
    }

    pub fn dialogs(&self) -> &DialogManager {
        &self.dialogs
    }

    /// Handle one event. Returns true when the app should exit.
    pub fn handle_event(&mut self, event: Event) -> Result<bool> {
        match event {
            Event::Key(key) => {
                if !self.dialogs.handle_key_event(key) {
                    self.handle_page_key(key);
                }
                self.process_settled_dialogs();
            }
            Event::Resize(width, height) => debug!(width, height, "Terminal resized"),
            Event::Tick => {}
        }
        Ok(self.should_quit)
    }

    fn handle_page_key(&mut self, key: KeyEvent) {
        self.status = None;

        if self.keys.force_quit.matches(&key) {
            info!("Quit requested");
            self.should_quit = true;
        } else if self.keys.quit.matches(&key) {
            self.open_dialog(DialogPurpose::Quit, DialogInit::quit());
        } else if self.keys.help.matches(&key) {
            let help = DialogInit::notice("Keys", self.keys.help_text()).with_id(dialog_ids::HELP);
            self.open_dialog(DialogPurpose::Notice, help);
        } else if self.keys.next_page.matches(&key) {
            match self.record.next_of(self.current) {
                Some(next) => {
                    self.history.push(self.current);
                    self.go_to(next);
                }
                None => self.status = Some("This is the last page".to_string()),
            }
        } else if self.keys.previous_page.matches(&key) {
            match self.history.pop() {
                Some(previous) => self.go_to(previous),
                None => self.status = Some("This is the first page".to_string()),
            }
        } else if self.keys.scroll_down.matches(&key) {
            self.scroll = self.scroll.saturating_add(1);
        } else if self.keys.scroll_up.matches(&key) {
            self.scroll = self.scroll.saturating_sub(1);
        } else if self.keys.delete_page.matches(&key) {
            self.confirm_delete();
        }
    }

    fn go_to(&mut self, page: PageId) {
        debug!(from = self.current, to = page, "Changing page");
        self.current = page;
        self.scroll = 0;
    }

    fn open_dialog(&mut self, purpose: DialogPurpose, init: DialogInit) {
        let handle = self.dialogs.create(init);
        self.pending.push((purpose, handle));
    }

    fn confirm_delete(&mut self) {
        let Some(page) = self.record.get(self.current) else {
            return;
        };
        let question = format!(
            "Delete page {} \"{}\"? Later pages move down by one.",
            page.id, page.title
        );
        let init = DialogInit::confirm(dialog_ids::DELETE_PAGE, "Delete page", question, "Delete");
        self.open_dialog(DialogPurpose::DeletePage(self.current), init);
    }

    fn process_settled_dialogs(&mut self) {
        let mut settled = Vec::new();
        self.pending.retain_mut(|(purpose, handle)| match handle.try_response() {
            Some(response) => {
                settled.push((*purpose, response));
                false
            }
            None => true,
        });

        for (purpose, response) in settled {
            self.on_dialog_closed(purpose, response);
        }
    }

    fn on_dialog_closed(&mut self, purpose: DialogPurpose, response: DialogResponse) {
        if response.is_cancelled() {
            return;
        }
        match purpose {
            DialogPurpose::Quit => {
                info!("Quit confirmed");
                self.should_quit = true;
            }
            DialogPurpose::DeletePage(page) => self.delete_page(page),
            DialogPurpose::Notice => {}
        }
    }

    fn delete_page(&mut self, page: PageId) {
        if self.record.len() <= 1 {
            self.open_dialog(
                DialogPurpose::Notice,
                DialogInit::error("A story needs at least one page."),
            );
            return;
        }

        let mut record = self.record.clone();
        record.delete_pages(&[page]);
        if let Err(e) = self.db.replace_story(self.story, &record) {
            error!("Failed to save story {}: {}", self.story, e);
            self.open_dialog(DialogPurpose::Notice, DialogInit::error(e.to_string()));
            return;
        }

        info!(story = self.story, page, "Deleted page");
        self.record = record;
        self.history.clear();
        let last = self.record.last_id().unwrap_or(1);
        self.go_to(page.min(last));
        self.status = Some(format!("Deleted page {page}"));
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1), Constraint::Length(1)])
            .split(area);

        let page = self.record.get(self.current);
        let title = page.map(|p| p.title.as_str()).unwrap_or("");
        let header = Line::from(vec![
            Span::styled(
                version::APP_NAME,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "  story {}  page {}/{}  {}",
                self.story,
                self.current,
                self.record.len(),
                title
            )),
        ]);
        frame.render_widget(Paragraph::new(header), chunks[0]);

        let text = page
            .map(|p| markup::to_plain_text(&p.content, &self.config.markup))
            .unwrap_or_default();
        let body = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));
        frame.render_widget(body, chunks[1]);

        let footer = match &self.status {
            Some(status) => Line::from(Span::styled(status.clone(), Style::default().fg(Color::Yellow))),
            None => Line::from(Span::styled(self.keys.short_help(), Style::default().fg(Color::DarkGray))),
        };
        frame.render_widget(Paragraph::new(footer), chunks[2]);

        let layer = DialogLayer::new(self.dialogs.dialogs()).with_options(self.config.markup.clone());
        frame.render_widget(layer, area);
    }
}
