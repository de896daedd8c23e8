use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use super::{
    pages::PagesCommand,
    preview::PreviewCommand,
    render::{RenderCommand, SanitizeCommand},
};
use crate::config::Config;

/// Fablemark - story markup tools for your terminal
#[derive(Debug, Parser)]
#[command(
    name = "fablemark",
    version,
    about = "Sanitize, render and preview interactive-fiction story markup",
    long_about = r#"Fablemark turns the bracket markup used by story pages into safe markup,
HTML or plain text, stores pages in a local database and previews them in the terminal.

Examples:
  fablemark render page.txt                 # Render a page to HTML
  fablemark sanitize < in                   # Sanitize markup from stdin
  fablemark pages import -s 1 page.txt      # Append a page to story 1
  fablemark preview -s 1                    # Read story 1 in the terminal"#
)]
pub struct Cli {
    /// Configuration file to use instead of the default locations
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render markup as HTML, text or sanitized markup
    Render(RenderCommand),

    /// Print sanitized markup, safe to store
    Sanitize(SanitizeCommand),

    /// Manage stored story pages
    Pages(PagesCommand),

    /// Read a story in the terminal
    Preview(PreviewCommand),
}

impl Cli {
    /// Whether the command takes over the terminal
    pub fn is_interactive(&self) -> bool {
        matches!(self.command, Commands::Preview(_))
    }

    pub async fn execute(self) -> Result<()> {
        if self.debug {
            debug!("Debug logging enabled");
        }

        let config = Config::init(self.config.as_deref()).await?;
        debug!("Configuration initialized");

        match &self.command {
            Commands::Render(cmd) => cmd.execute(&config),
            Commands::Sanitize(cmd) => cmd.execute(&config),
            Commands::Pages(cmd) => cmd.execute(&config),
            Commands::Preview(cmd) => {
                info!("Starting interactive mode");
                cmd.execute(&config).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["fablemark", "preview", "-s", "4", "--debug"]).unwrap();
        assert!(cli.debug);
        assert!(cli.is_interactive());
        match cli.command {
            Commands::Preview(cmd) => {
                assert_eq!(cmd.story, 4);
                assert_eq!(cmd.page, 1);
            }
            _ => panic!("expected preview command"),
        }
    }

    #[test]
    fn test_pages_delete_requires_pages() {
        assert!(Cli::try_parse_from(["fablemark", "pages", "delete", "-s", "1"]).is_err());
        assert!(Cli::try_parse_from(["fablemark", "pages", "delete", "-s", "1", "2", "3"]).is_ok());
    }
}
