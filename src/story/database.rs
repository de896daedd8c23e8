//! Database layer for story pages
//!
//! Page content is stored exactly as the author wrote it. Sanitizing and
//! rendering happen on the way out, so changing the markup rules never
//! requires a migration.

use super::record::{PageId, StoryPage, StoryPageRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use tracing::info;

/// Story identifier as stored in the database
pub type StoryId = i64;

/// Result type for page store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid page links: {0}")]
    Links(#[from] serde_json::Error),

    #[error("Invalid publish date '{value}': {source}")]
    Date {
        value: String,
        source: chrono::ParseError,
    },

    #[error("Story {story} has no page {page}")]
    PageNotFound { story: StoryId, page: PageId },
}

/// Summary row for `pages list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorySummary {
    pub story_id: StoryId,
    pub page_count: usize,
}

/// Database manager for story pages
pub struct PageDatabase {
    conn: Connection,
}

impl PageDatabase {
    /// Open (or create) the database file
    pub fn new<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let conn = Connection::open(db_path.as_ref())?;
        let db = Self { conn };
        db.create_tables()?;
        info!("Opened page database at {}", db_path.as_ref().display());
        Ok(db)
    }

    /// In-memory database, used by tests
    pub fn in_memory() -> StoreResult<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> StoreResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS pages (
                story_id INTEGER NOT NULL,
                page_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                next_pages TEXT NOT NULL,
                unlisted INTEGER NOT NULL DEFAULT 0,
                published TEXT,
                PRIMARY KEY (story_id, page_id)
            )",
            [],
        )?;
        Ok(())
    }

    /// Insert or replace one page
    pub fn save_page(&self, story_id: StoryId, page: &StoryPage) -> StoreResult<()> {
        Self::write_page(&self.conn, story_id, page)
    }

    fn write_page(conn: &Connection, story_id: StoryId, page: &StoryPage) -> StoreResult<()> {
        let next_pages = serde_json::to_string(&page.next_pages)?;
        let published = page.published.map(|date| date.to_rfc3339());

        conn.execute(
            "INSERT OR REPLACE INTO pages (
                story_id, page_id, title, content, next_pages, unlisted, published
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                story_id,
                page.id,
                page.title,
                page.content,
                next_pages,
                page.unlisted,
                published
            ],
        )?;
        Ok(())
    }

    /// Load every page of a story
    pub fn load_story(&self, story_id: StoryId) -> StoreResult<StoryPageRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT page_id, title, content, next_pages, unlisted, published
             FROM pages WHERE story_id = ?1 ORDER BY page_id",
        )?;
        let rows = stmt.query_map(params![story_id], RawPage::from_row)?;

        let mut pages = Vec::new();
        for row in rows {
            pages.push(row?.into_page()?);
        }
        Ok(pages.into_iter().collect())
    }

    pub fn load_page(&self, story_id: StoryId, page_id: PageId) -> StoreResult<StoryPage> {
        let mut stmt = self.conn.prepare(
            "SELECT page_id, title, content, next_pages, unlisted, published
             FROM pages WHERE story_id = ?1 AND page_id = ?2",
        )?;
        let mut rows = stmt.query_map(params![story_id, page_id], RawPage::from_row)?;
        match rows.next() {
            Some(row) => row?.into_page(),
            None => Err(StoreError::PageNotFound {
                story: story_id,
                page: page_id,
            }),
        }
    }

    /// Replace all pages of a story in one transaction
    pub fn replace_story(&mut self, story_id: StoryId, record: &StoryPageRecord) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM pages WHERE story_id = ?1", params![story_id])?;
        for page in record.pages() {
            Self::write_page(&tx, story_id, page)?;
        }
        tx.commit()?;
        info!(story_id, pages = record.len(), "Saved story");
        Ok(())
    }

    /// Stories with their page counts
    pub fn list_stories(&self) -> StoreResult<Vec<StorySummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT story_id, COUNT(*) FROM pages GROUP BY story_id ORDER BY story_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StorySummary {
                story_id: row.get(0)?,
                page_count: row.get::<_, i64>(1)? as usize,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// A row before its JSON and date columns are parsed
struct RawPage {
    id: PageId,
    title: String,
    content: String,
    next_pages: String,
    unlisted: bool,
    published: Option<String>,
}

impl RawPage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            next_pages: row.get(3)?,
            unlisted: row.get(4)?,
            published: row.get(5)?,
        })
    }

    fn into_page(self) -> StoreResult<StoryPage> {
        let published = match self.published {
            Some(value) => match DateTime::parse_from_rfc3339(&value) {
                Ok(date) => Some(date.with_timezone(&Utc)),
                Err(source) => return Err(StoreError::Date { value, source }),
            },
            None => None,
        };

        Ok(StoryPage {
            id: self.id,
            title: self.title,
            content: self.content,
            next_pages: serde_json::from_str(&self.next_pages)?,
            unlisted: self.unlisted,
            published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_round_trips_raw_markup() {
        let db = PageDatabase::in_memory().unwrap();
        let mut page = StoryPage::new(1, "Start", "[b]Hi[/b] <script>x</script> C:\\dir &amp; \n\n");
        page.next_pages = vec![2, 3];
        page.unlisted = true;
        page.published = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        db.save_page(7, &page).unwrap();

        assert_eq!(db.load_page(7, 1).unwrap(), page);
        assert!(matches!(
            db.load_page(7, 2),
            Err(StoreError::PageNotFound { story: 7, page: 2 })
        ));
    }

    #[test]
    fn test_replace_story_after_delete() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pages.db");

        let mut record = StoryPageRecord::new();
        for n in 1..=3 {
            record.push(format!("Page {n}"), format!("content {n}"));
        }

        {
            let mut db = PageDatabase::new(&path).unwrap();
            db.replace_story(1, &record).unwrap();
            record.delete_pages(&[1]);
            db.replace_story(1, &record).unwrap();
        }

        let db = PageDatabase::new(&path).unwrap();
        let loaded = db.load_story(1).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.get(1).unwrap().title, "Page 2");
        assert_eq!(
            db.list_stories().unwrap(),
            vec![StorySummary {
                story_id: 1,
                page_count: 2
            }]
        );
    }
}
