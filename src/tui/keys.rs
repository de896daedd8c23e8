use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Key binding configuration
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub keys: Vec<KeyCode>,
    pub modifiers: KeyModifiers,
    pub description: String,
}

impl KeyBinding {
    pub fn new(keys: &[KeyCode], modifiers: KeyModifiers, description: &str) -> Self {
        Self {
            keys: keys.to_vec(),
            modifiers,
            description: description.to_string(),
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        // Terminals disagree on whether shifted characters carry SHIFT
        let modifiers = match event.code {
            KeyCode::Char(_) => event.modifiers - KeyModifiers::SHIFT,
            _ => event.modifiers,
        };
        self.keys.contains(&event.code) && self.modifiers == modifiers
    }

    /// Display form of the first key, e.g. `ctrl+c`
    pub fn label(&self) -> String {
        let key = match self.keys.first() {
            Some(KeyCode::Char(' ')) => "space".to_string(),
            Some(KeyCode::Char(c)) => c.to_string(),
            Some(KeyCode::Left) => "←".to_string(),
            Some(KeyCode::Right) => "→".to_string(),
            Some(KeyCode::Up) => "↑".to_string(),
            Some(KeyCode::Down) => "↓".to_string(),
            Some(KeyCode::F(n)) => format!("f{n}"),
            Some(other) => format!("{other:?}").to_lowercase(),
            None => String::new(),
        };
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            format!("ctrl+{key}")
        } else {
            key
        }
    }
}

/// Previewer key mappings
#[derive(Debug, Clone)]
pub struct KeyMap {
    /// Ask before quitting
    pub quit: KeyBinding,

    /// Quit without asking
    pub force_quit: KeyBinding,

    pub help: KeyBinding,
    pub next_page: KeyBinding,
    pub previous_page: KeyBinding,
    pub scroll_down: KeyBinding,
    pub scroll_up: KeyBinding,
    pub delete_page: KeyBinding,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            quit: KeyBinding::new(&[KeyCode::Char('q')], KeyModifiers::NONE, "Quit"),
            force_quit: KeyBinding::new(
                &[KeyCode::Char('c')],
                KeyModifiers::CONTROL,
                "Quit immediately",
            ),
            help: KeyBinding::new(
                &[KeyCode::Char('?'), KeyCode::F(1)],
                KeyModifiers::NONE,
                "Show help",
            ),
            next_page: KeyBinding::new(
                &[KeyCode::Right, KeyCode::Char('n'), KeyCode::Char(' ')],
                KeyModifiers::NONE,
                "Next page",
            ),
            previous_page: KeyBinding::new(
                &[KeyCode::Left, KeyCode::Char('p'), KeyCode::Backspace],
                KeyModifiers::NONE,
                "Previous page",
            ),
            scroll_down: KeyBinding::new(
                &[KeyCode::Down, KeyCode::Char('j')],
                KeyModifiers::NONE,
                "Scroll down",
            ),
            scroll_up: KeyBinding::new(
                &[KeyCode::Up, KeyCode::Char('k')],
                KeyModifiers::NONE,
                "Scroll up",
            ),
            delete_page: KeyBinding::new(&[KeyCode::Char('d')], KeyModifiers::NONE, "Delete page"),
        }
    }
}

impl KeyMap {
    pub fn bindings(&self) -> [&KeyBinding; 8] {
        [
            &self.next_page,
            &self.previous_page,
            &self.scroll_down,
            &self.scroll_up,
            &self.delete_page,
            &self.help,
            &self.quit,
            &self.force_quit,
        ]
    }

    /// Get help text for all key bindings
    pub fn help_text(&self) -> String {
        self.bindings()
            .iter()
            .map(|binding| format!("{:<8} {}", binding.label(), binding.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One-line hint for the footer
    pub fn short_help(&self) -> String {
        [&self.previous_page, &self.next_page, &self.help, &self.quit]
            .iter()
            .map(|binding| format!("{} {}", binding.label(), binding.description.to_lowercase()))
            .collect::<Vec<_>>()
            .join("  ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shifted_characters_match() {
        let keys = KeyMap::default();
        let question = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert!(keys.help.matches(&question));
        assert!(!keys.quit.matches(&KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)));
        assert!(keys.force_quit.matches(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_help_text_lists_bindings() {
        let text = KeyMap::default().help_text();
        assert_eq!(text.lines().count(), 8);
        assert!(text.contains("ctrl+c"));
        assert!(text.contains("Delete page"));
    }
}
