//! Story markup: bracket tags with embedded HTML
//!
//! Author text goes through one pipeline for every output:
//!
//! 1. [`mark_entities`] shields the entities the author typed.
//! 2. With `escape_html`, angle brackets become (marked) entities.
//! 3. The tokenizer builds a [`Document`] of tag, HTML and text nodes.
//! 4. A serializer writes markup, HTML or plain text and unmarks the result.
//!
//! Malformed input never fails; whatever cannot be matched is kept as text.

pub mod entities;
pub mod html;
pub mod parser;
pub mod render;
pub mod tags;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use entities::{mark_entities, unmark_entities};
pub use html::{HtmlPolicy, HtmlTag};
pub use parser::{Document, Node, TagNode};
pub use tags::{Attribute, BbTag};

/// Knobs for [`parse`] and the functions built on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Pass raw HTML tags through verbatim instead of filtering them
    pub keep_html_tags: bool,
    /// Turn angle brackets into entities so no HTML tag is recognized
    pub escape_html: bool,
    /// Drop recognized bracket tags, keeping their content
    pub strip_bb_tags: bool,
    /// Trim line breaks at block boundaries
    pub trim_block_whitespace: bool,
    /// Tags nested deeper than this are kept as text
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            keep_html_tags: false,
            escape_html: false,
            strip_bb_tags: false,
            trim_block_whitespace: true,
            max_depth: 64,
        }
    }
}

/// Parses author markup into a [`Document`].
pub fn parse(input: &str, options: &ParseOptions) -> Document {
    let mut marked = mark_entities(input);
    if options.escape_html {
        marked = entities::escape_angle_brackets(&marked);
    }
    parser::parse_marked(&marked, options)
}

const MAX_SANITIZE_PASSES: usize = 32;

/// Returns markup that is safe to store and render.
///
/// Whitespace is left as written. Dropping an HTML tag or stripping a
/// bracket tag can bring two pieces of text together into a new tag, so
/// passes repeat until the output no longer changes; sanitizing the result
/// again returns it unchanged.
pub fn sanitize(input: &str, options: &ParseOptions) -> String {
    let options = ParseOptions {
        trim_block_whitespace: false,
        ..options.clone()
    };

    let mut current = parse(input, &options).to_markup();
    for pass in 1..MAX_SANITIZE_PASSES {
        let next = parse(&current, &options).to_markup();
        if next == current {
            return current;
        }
        debug!(pass, "sanitized markup changed on re-parse");
        current = next;
    }
    current
}

/// Renders author markup to HTML.
pub fn render_html(input: &str, options: &ParseOptions) -> String {
    parse(input, options).to_html()
}

/// Returns the text a reader would see.
pub fn to_plain_text(input: &str, options: &ParseOptions) -> String {
    parse(input, options).to_plain_text()
}
