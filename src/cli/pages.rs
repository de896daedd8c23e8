//! Page management commands

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::markup::{self, ParseOptions};
use crate::story::{PageDatabase, PageId, StoryId, StoryPageRecord};

/// Manage stored story pages
#[derive(Debug, Args)]
pub struct PagesCommand {
    #[command(subcommand)]
    pub command: PagesSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum PagesSubcommand {
    /// Append a page read from a markup file
    Import {
        #[arg(short, long)]
        story: StoryId,

        /// Markup file with the page content
        file: PathBuf,

        /// Page title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Hide the page from the story's page list
        #[arg(long)]
        unlisted: bool,
    },

    /// List stories, or the pages of one story
    List {
        #[arg(short, long)]
        story: Option<StoryId>,
    },

    /// Delete pages, renumbering the ones after them
    Delete {
        #[arg(short, long)]
        story: StoryId,

        #[arg(required = true)]
        pages: Vec<PageId>,
    },
}

impl PagesCommand {
    pub fn execute(&self, config: &Config) -> Result<()> {
        let mut db = PageDatabase::new(config.database_path())?;

        match &self.command {
            PagesSubcommand::Import {
                story,
                file,
                title,
                unlisted,
            } => {
                let content = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let title = title.clone().unwrap_or_else(|| {
                    file.file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_default()
                });

                let mut record = db.load_story(*story)?;
                let id = import_page(&mut record, title, content, *unlisted);
                db.replace_story(*story, &record)?;
                info!(story, page = id, "Imported page");
                println!("Imported page {} into story {}", id, story);
            }
            PagesSubcommand::List { story: None } => {
                let stories = db.list_stories()?;
                if stories.is_empty() {
                    println!("No stories stored in {}", config.database_path().display());
                }
                for summary in stories {
                    println!("story {:>6}  {:>5} pages", summary.story_id, summary.page_count);
                }
            }
            PagesSubcommand::List { story: Some(story) } => {
                let record = db.load_story(*story)?;
                for line in list_lines(&record, &config.markup) {
                    println!("{}", line);
                }
            }
            PagesSubcommand::Delete { story, pages } => {
                let mut record = db.load_story(*story)?;
                let removed = record.delete_pages(pages);
                if removed.is_empty() {
                    return Err(anyhow!("Story {} has none of pages {:?}", story, pages));
                }
                db.replace_story(*story, &record)?;
                println!(
                    "Deleted {} page(s); story {} now has {} pages",
                    removed.len(),
                    story,
                    record.len()
                );
            }
        }
        Ok(())
    }
}

fn import_page(record: &mut StoryPageRecord, title: String, content: String, unlisted: bool) -> PageId {
    let id = record.push(title, content);
    if let Some(mut page) = record.get(id).cloned() {
        page.unlisted = unlisted;
        page.published = Some(Utc::now());
        record.insert(page);
    }
    id
}

/// One line per page: id, title, links and a preview of the text
fn list_lines(record: &StoryPageRecord, options: &ParseOptions) -> Vec<String> {
    record
        .pages()
        .map(|page| {
            let text = markup::to_plain_text(&page.content, options);
            let preview: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
            let preview: String = preview.chars().take(48).collect();
            let links = page
                .next_pages
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            format!(
                "{:>4}  {:<24}  -> [{}]{}  {}",
                page.id,
                page.title,
                links,
                if page.unlisted { " (unlisted)" } else { "" },
                preview
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_appends_and_publishes() {
        let mut record = StoryPageRecord::new();
        assert_eq!(import_page(&mut record, "One".into(), "a".into(), false), 1);
        assert_eq!(import_page(&mut record, "Two".into(), "b".into(), true), 2);

        let two = record.get(2).unwrap();
        assert!(two.unlisted);
        assert!(two.published.is_some());
        assert_eq!(record.get(1).unwrap().next_pages, vec![2]);
    }

    #[test]
    fn test_list_shows_plain_text() {
        let mut record = StoryPageRecord::new();
        record.push("Start", "[center]\nHello [b]reader[/b]\n[/center]");
        let lines = list_lines(&record, &ParseOptions::default());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Start"));
        assert!(lines[0].ends_with("Hello reader"));
    }
}
