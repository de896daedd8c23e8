//! Dialog system for modal UI components
//!
//! Dialogs live in a stack owned by [`DialogManager`]. Opening one returns a
//! [`DialogHandle`] that completes exactly once, when the dialog is resolved
//! with an action, dismissed with Escape, replaced or dropped.

pub mod handle;
pub mod layer;
pub mod manager;
pub mod presets;
pub mod types;

pub use handle::DialogHandle;
pub use layer::DialogLayer;
pub use manager::DialogManager;
pub use types::*;
