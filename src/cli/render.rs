use anyhow::{Context, Result};
use clap::Args;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;
use crate::markup::{self, ParseOptions};

/// Markup input and parsing flags shared by `render` and `sanitize`
#[derive(Debug, Args)]
pub struct MarkupInput {
    /// Markup file to read. Reads stdin when omitted
    pub file: Option<PathBuf>,

    /// Pass HTML tags through unfiltered
    #[arg(long = "keep-html")]
    pub keep_html: bool,

    /// Show HTML tags as text
    #[arg(long = "escape-html", conflicts_with = "keep_html")]
    pub escape_html: bool,

    /// Remove bracket tags, keeping their content
    #[arg(long = "strip-tags")]
    pub strip_tags: bool,

    /// Keep line breaks at block boundaries
    #[arg(long = "no-trim")]
    pub no_trim: bool,
}

/// Render story markup from a file or stdin
#[derive(Debug, Args)]
pub struct RenderCommand {
    #[command(flatten)]
    pub input: MarkupInput,

    /// Output format
    #[arg(short, long, value_enum, default_value = "html")]
    pub format: RenderFormat,
}

/// Print markup that is safe to store
#[derive(Debug, Args)]
pub struct SanitizeCommand {
    #[command(flatten)]
    pub input: MarkupInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderFormat {
    /// HTML for display
    Html,
    /// Text a reader would see
    Text,
    /// Sanitized markup, safe to store
    Markup,
}

impl RenderCommand {
    pub fn execute(&self, config: &Config) -> Result<()> {
        self.input.run(config, self.format)
    }
}

impl SanitizeCommand {
    pub fn execute(&self, config: &Config) -> Result<()> {
        self.input.run(config, RenderFormat::Markup)
    }
}

impl MarkupInput {
    fn run(&self, config: &Config, format: RenderFormat) -> Result<()> {
        let input = self.read_input()?;
        let options = self.options(&config.markup);
        debug!(?options, ?format, "Rendering markup");

        let output = render(&input, format, &options);
        print!("{}", output);
        if !output.ends_with('\n') {
            println!();
        }
        Ok(())
    }

    /// Command-line flags layered over the configured defaults
    pub fn options(&self, defaults: &ParseOptions) -> ParseOptions {
        let mut options = defaults.clone();
        if self.keep_html {
            options.keep_html_tags = true;
            options.escape_html = false;
        }
        if self.escape_html {
            options.escape_html = true;
        }
        if self.strip_tags {
            options.strip_bb_tags = true;
        }
        if self.no_trim {
            options.trim_block_whitespace = false;
        }
        options
    }

    fn read_input(&self) -> Result<String> {
        match &self.file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display())),
            None => {
                debug!("Reading markup from stdin");
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read from stdin")?;
                Ok(buffer)
            }
        }
    }
}

pub fn render(input: &str, format: RenderFormat, options: &ParseOptions) -> String {
    match format {
        RenderFormat::Html => markup::render_html(input, options),
        RenderFormat::Text => markup::to_plain_text(input, options),
        RenderFormat::Markup => markup::sanitize(input, options),
    }
}
