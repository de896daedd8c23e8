use anyhow::{anyhow, Result};
use clap::Args;
use tracing::info;

use crate::config::Config;
use crate::story::{PageDatabase, PageId, StoryId};
use crate::tui::{self, App};

/// Read a story page by page in the terminal
#[derive(Debug, Args)]
pub struct PreviewCommand {
    #[arg(short, long)]
    pub story: StoryId,

    /// Page to open first
    #[arg(short, long, default_value_t = 1)]
    pub page: PageId,
}

impl PreviewCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        config.validate()?;

        let db = PageDatabase::new(config.database_path())?;
        let record = db.load_story(self.story)?;
        if record.get(self.page).is_none() {
            return Err(anyhow!("Story {} has no page {}", self.story, self.page));
        }

        info!(story = self.story, page = self.page, "Starting preview");
        let app = App::new(config.clone(), db, self.story, record, self.page);
        tui::run(app, config.preview.tick_ms).await?;
        info!("Preview finished");
        Ok(())
    }
}
