//! Dialog manager for handling the dialog stack and lifecycle
//!
//! The dialog manager is responsible for:
//! - Keeping open dialogs in creation order (last = topmost)
//! - Settling each dialog's handle exactly once
//! - Routing keyboard input to the topmost dialog only
//! - Telling observers about every change to the stack

use super::handle::DialogHandle;
use super::types::*;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Dialog manager handles the dialog stack and lifecycle
#[derive(Default)]
pub struct DialogManager {
    /// Stack of open dialogs (last = topmost)
    dialogs: Vec<DialogDescriptor>,

    /// Settlement side of every live dialog
    senders: HashMap<DialogId, oneshot::Sender<DialogResponse>>,

    next_sequence: u64,

    observers: Vec<(SubscriptionId, Box<dyn DialogObserver>)>,

    next_subscription: u64,

    /// Event sender for dialog events
    event_sender: Option<mpsc::UnboundedSender<DialogEvent>>,
}

impl std::fmt::Debug for DialogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogManager")
            .field("dialogs", &self.dialogs)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl DialogManager {
    /// Create a new dialog manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the event sender for dialog events
    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<DialogEvent>) {
        self.event_sender = Some(sender);
    }

    /// Register an observer; it is called after every change to the stack.
    pub fn subscribe(&mut self, observer: impl DialogObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    /// Open a dialog on top of the stack.
    ///
    /// A live dialog with the same id is cancelled and removed first, so the
    /// new one always ends up on top.
    pub fn create(&mut self, init: DialogInit) -> DialogHandle {
        let id = init.id.clone().unwrap_or_else(DialogId::generate);

        if self.senders.contains_key(&id) {
            info!(dialog_id = %id, "Replacing open dialog");
            self.settle(&id, DialogResponse::cancelled());
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let (sender, receiver) = oneshot::channel();
        self.senders.insert(id.clone(), sender);
        self.dialogs
            .push(DialogDescriptor::from_init(id.clone(), init, sequence));

        debug!(dialog_id = %id, depth = self.dialogs.len(), "Dialog opened");
        self.notify();
        self.send_event(DialogEvent::Opened(id.clone()));

        DialogHandle::new(id, receiver)
    }

    /// Settle a dialog and remove it from the stack.
    ///
    /// Only the first resolution of a dialog has any effect; later ones
    /// return [`DialogError::NotFound`].
    pub fn resolve(&mut self, id: &DialogId, response: DialogResponse) -> DialogResult<()> {
        if self.settle(id, response) {
            Ok(())
        } else {
            warn!(dialog_id = %id, "Attempted to resolve a dialog that is not open");
            Err(DialogError::NotFound(id.clone()))
        }
    }

    /// Resolve a dialog with one of its actions.
    pub fn choose_action(&mut self, id: &DialogId, index: usize) -> DialogResult<()> {
        let dialog = self
            .get_by_id(id)
            .ok_or_else(|| DialogError::NotFound(id.clone()))?;
        let action = dialog
            .actions
            .get(index)
            .cloned()
            .ok_or_else(|| DialogError::InvalidAction {
                id: id.clone(),
                index,
            })?;
        let values = dialog.values.clone();

        self.resolve(id, DialogResponse::with_action(action, values))
    }

    /// Update a form value of an open dialog.
    pub fn set_value(
        &mut self,
        id: &DialogId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> DialogResult<()> {
        let dialog = self
            .get_by_id_mut(id)
            .ok_or_else(|| DialogError::NotFound(id.clone()))?;
        dialog.values.insert(key.into(), value.into());
        self.notify();
        Ok(())
    }

    /// Highlight one of a dialog's actions.
    pub fn select_action(&mut self, id: &DialogId, index: usize) -> DialogResult<()> {
        let dialog = self
            .get_by_id_mut(id)
            .ok_or_else(|| DialogError::NotFound(id.clone()))?;
        if index >= dialog.actions.len() {
            return Err(DialogError::InvalidAction {
                id: id.clone(),
                index,
            });
        }
        dialog.selected = index;
        self.notify();
        Ok(())
    }

    pub fn get_by_id(&self, id: &DialogId) -> Option<&DialogDescriptor> {
        self.dialogs.iter().find(|d| d.id == *id)
    }

    fn get_by_id_mut(&mut self, id: &DialogId) -> Option<&mut DialogDescriptor> {
        self.dialogs.iter_mut().find(|d| d.id == *id)
    }

    /// Open dialogs, oldest first
    pub fn dialogs(&self) -> &[DialogDescriptor] {
        &self.dialogs
    }

    /// The dialog that receives input
    pub fn top(&self) -> Option<&DialogDescriptor> {
        self.dialogs.last()
    }

    pub fn has_dialogs(&self) -> bool {
        !self.dialogs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dialogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialogs.is_empty()
    }

    /// Cancel the topmost dialog, returning its id.
    pub fn cancel_top(&mut self) -> Option<DialogId> {
        let id = self.top()?.id.clone();
        self.settle(&id, DialogResponse::cancelled());
        Some(id)
    }

    /// Cancel every open dialog, newest first.
    pub fn cancel_all(&mut self) {
        while self.cancel_top().is_some() {}
    }

    /// Handle a key press.
    ///
    /// Only the topmost dialog sees input. Returns true when the key was
    /// consumed, which is always the case while any dialog is open.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        let Some(top) = self.top() else {
            return false;
        };
        let id = top.id.clone();
        let selected = top.selected;
        let count = top.actions.len();

        match (key.code, key.modifiers) {
            (KeyCode::Esc, KeyModifiers::NONE) => {
                debug!(dialog_id = %id, "Dialog dismissed");
                self.settle(&id, DialogResponse::cancelled());
            }
            (KeyCode::Enter, KeyModifiers::NONE) => {
                if let Err(e) = self.choose_action(&id, selected) {
                    warn!("Failed to choose dialog action: {}", e);
                }
            }
            (KeyCode::Tab, _) | (KeyCode::Right, _) if count > 0 => {
                let _ = self.select_action(&id, (selected + 1) % count);
            }
            (KeyCode::BackTab, _) | (KeyCode::Left, _) if count > 0 => {
                let _ = self.select_action(&id, (selected + count - 1) % count);
            }
            _ => {}
        }
        true
    }

    /// Removes a dialog and completes its handle. Returns false if the dialog
    /// was not open.
    fn settle(&mut self, id: &DialogId, response: DialogResponse) -> bool {
        let Some(index) = self.dialogs.iter().position(|d| d.id == *id) else {
            return false;
        };
        self.dialogs.remove(index);
        let sender = self.senders.remove(id);

        // The stack is consistent before anyone hears about the settlement
        self.notify();
        self.send_event(DialogEvent::Resolved {
            id: id.clone(),
            cancelled: response.is_cancelled(),
        });

        if let Some(sender) = sender {
            if sender.send(response).is_err() {
                debug!(dialog_id = %id, "Dialog handle was dropped before settlement");
            }
        }
        true
    }

    fn notify(&mut self) {
        for (_, observer) in self.observers.iter_mut() {
            observer.on_change(&self.dialogs);
        }
    }

    fn send_event(&self, event: DialogEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }
}
