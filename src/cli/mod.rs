mod pages;
mod preview;
mod render;
pub(crate) mod root;

pub use pages::PagesCommand;
pub use preview::PreviewCommand;
pub use render::{render, MarkupInput, RenderCommand, RenderFormat, SanitizeCommand};
pub use root::Cli;
