//! Core dialog types
//!
//! A dialog is split into the record the stack keeps ([`DialogDescriptor`])
//! and the awaitable the caller keeps ([`super::DialogHandle`]); the two are
//! correlated by [`DialogId`].

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Unique identifier for dialog instances
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DialogId(pub String);

impl DialogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DialogId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DialogId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DialogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A button of a dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogAction {
    pub label: Cow<'static, str>,
    /// Focused when the dialog opens and triggered by Enter
    pub autofocus: bool,
    /// Choosing this action counts as cancelling the dialog
    pub cancels: bool,
}

/// The shared "Cancel" action
pub const CANCEL: DialogAction = DialogAction {
    label: Cow::Borrowed("Cancel"),
    autofocus: false,
    cancels: true,
};

/// The shared "OK" action
pub const OK: DialogAction = DialogAction {
    label: Cow::Borrowed("OK"),
    autofocus: true,
    cancels: false,
};

impl DialogAction {
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            autofocus: false,
            cancels: false,
        }
    }

    pub fn with_autofocus(mut self, autofocus: bool) -> Self {
        self.autofocus = autofocus;
        self
    }

    pub fn cancelling(mut self) -> Self {
        self.cancels = true;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// What application code asks for when it opens a dialog
#[derive(Debug, Clone, Default)]
pub struct DialogInit {
    /// Reusing the id of a live dialog cancels that dialog first
    pub id: Option<DialogId>,
    pub title: String,
    /// Story markup, rendered as plain text
    pub content: String,
    pub actions: Vec<DialogAction>,
    /// Initial form values
    pub values: BTreeMap<String, String>,
}

impl DialogInit {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<DialogId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_action(mut self, action: DialogAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// One live dialog as stored in the stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogDescriptor {
    pub id: DialogId,
    pub title: String,
    pub content: String,
    pub actions: Vec<DialogAction>,
    pub values: BTreeMap<String, String>,
    /// Creation order; strictly increasing within a manager
    pub sequence: u64,
    /// Index of the highlighted action
    pub selected: usize,
}

impl DialogDescriptor {
    pub(super) fn from_init(id: DialogId, init: DialogInit, sequence: u64) -> Self {
        let actions = if init.actions.is_empty() {
            vec![OK]
        } else {
            init.actions
        };
        let selected = actions.iter().position(|a| a.autofocus).unwrap_or(0);

        Self {
            id,
            title: init.title,
            content: init.content,
            actions,
            values: init.values,
            sequence,
            selected,
        }
    }

    pub fn selected_action(&self) -> Option<&DialogAction> {
        self.actions.get(self.selected)
    }
}

/// How a dialog was settled
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DialogResponse {
    /// `None` when the dialog was cancelled without choosing an action
    pub action: Option<DialogAction>,
    /// Form values at the time of settlement
    pub values: BTreeMap<String, String>,
}

impl DialogResponse {
    pub fn cancelled() -> Self {
        Self::default()
    }

    pub fn with_action(action: DialogAction, values: BTreeMap<String, String>) -> Self {
        Self {
            action: Some(action),
            values,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.action.as_ref().map_or(true, |a| a.cancels)
    }

    /// Label of the chosen action, unless cancelled
    pub fn chosen(&self) -> Option<&str> {
        self.action
            .as_ref()
            .filter(|a| !a.cancels)
            .map(|a| a.label())
    }
}

/// Notifications sent on the manager's event channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
    Opened(DialogId),
    Resolved { id: DialogId, cancelled: bool },
}

/// Result type for dialog operations
pub type DialogResult<T> = std::result::Result<T, DialogError>;

/// Dialog-specific error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("Dialog with ID '{0}' not found")]
    NotFound(DialogId),

    #[error("Dialog '{id}' has no action {index}")]
    InvalidAction { id: DialogId, index: usize },
}

/// Receives the whole stack after every change
pub trait DialogObserver: Send {
    fn on_change(&mut self, dialogs: &[DialogDescriptor]);
}

impl<F> DialogObserver for F
where
    F: FnMut(&[DialogDescriptor]) + Send,
{
    fn on_change(&mut self, dialogs: &[DialogDescriptor]) {
        self(dialogs)
    }
}

/// Identifies an observer registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(super) u64);

/// Predefined dialog IDs for the viewer's dialogs
pub mod dialog_ids {
    pub const QUIT: &str = "quit";
    pub const HELP: &str = "help";
    pub const DELETE_PAGE: &str = "delete_page";
    pub const ERROR: &str = "error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults_to_ok() {
        let descriptor = DialogDescriptor::from_init(DialogId::new("a"), DialogInit::new("Title"), 0);
        assert_eq!(descriptor.actions, vec![OK]);
        assert_eq!(descriptor.selected, 0);
    }

    #[test]
    fn test_autofocus_selects_action() {
        let init = DialogInit::new("Delete?")
            .with_action(DialogAction::new("Delete"))
            .with_action(CANCEL.with_autofocus(true));
        let descriptor = DialogDescriptor::from_init(DialogId::generate(), init, 3);
        assert_eq!(descriptor.selected, 1);
        assert_eq!(descriptor.selected_action(), Some(&CANCEL.with_autofocus(true)));
    }

    #[test]
    fn test_response_cancellation() {
        assert!(DialogResponse::cancelled().is_cancelled());
        assert!(DialogResponse::with_action(CANCEL, BTreeMap::new()).is_cancelled());
        let yes = DialogResponse::with_action(DialogAction::new("Yes"), BTreeMap::new());
        assert!(!yes.is_cancelled());
        assert_eq!(yes.chosen(), Some("Yes"));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(DialogId::generate(), DialogId::generate());
    }
}
