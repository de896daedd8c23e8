//! Ready-made dialogs used by the viewer

use super::types::{dialog_ids, DialogAction, DialogInit, CANCEL, OK};

impl DialogInit {
    /// A yes/cancel question. Cancel is focused so Enter is the safe choice.
    pub fn confirm(
        id: impl Into<super::DialogId>,
        title: impl Into<String>,
        question: impl Into<String>,
        confirm_label: &'static str,
    ) -> Self {
        DialogInit::new(title)
            .with_id(id)
            .with_content(question)
            .with_action(DialogAction::new(confirm_label))
            .with_action(CANCEL.with_autofocus(true))
    }

    /// A message with a single OK button.
    pub fn notice(title: impl Into<String>, message: impl Into<String>) -> Self {
        DialogInit::new(title).with_content(message).with_action(OK)
    }

    /// Confirm leaving the viewer
    pub fn quit() -> Self {
        Self::confirm(
            dialog_ids::QUIT,
            "Confirm Quit",
            "Are you sure you want to quit?",
            "Quit",
        )
    }

    /// An error report; a newer error replaces an older one.
    pub fn error(message: impl Into<String>) -> Self {
        Self::notice("Error", message).with_id(dialog_ids::ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::components::dialogs::DialogManager;

    #[test]
    fn test_quit_defaults_to_cancel() {
        let mut manager = DialogManager::new();
        let _h = manager.create(DialogInit::quit());
        let top = manager.top().unwrap();
        assert_eq!(top.id.as_str(), dialog_ids::QUIT);
        assert_eq!(top.selected_action().map(|a| a.cancels), Some(true));
    }

    #[test]
    fn test_errors_replace_each_other() {
        let mut manager = DialogManager::new();
        let first = manager.create(DialogInit::error("disk full"));
        let _second = manager.create(DialogInit::error("still full"));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.top().unwrap().content, "still full");
        assert!(futures::FutureExt::now_or_never(first).unwrap().is_cancelled());
    }
}
