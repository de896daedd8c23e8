//! In-memory page record of one story

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// 1-based page number, dense within a story
pub type PageId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPage {
    pub id: PageId,
    pub title: String,
    /// Raw markup as the author wrote it
    pub content: String,
    /// Pages linked at the bottom of this one
    #[serde(default)]
    pub next_pages: Vec<PageId>,
    #[serde(default)]
    pub unlisted: bool,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
}

impl StoryPage {
    pub fn new(id: PageId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            next_pages: Vec::new(),
            unlisted: false,
            published: None,
        }
    }
}

/// Pages of one story keyed by ID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryPageRecord {
    pages: BTreeMap<PageId, StoryPage>,
}

impl StoryPageRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PageId) -> Option<&StoryPage> {
        self.pages.get(&id)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages in ID order
    pub fn pages(&self) -> impl Iterator<Item = &StoryPage> {
        self.pages.values()
    }

    pub fn last_id(&self) -> Option<PageId> {
        self.pages.keys().next_back().copied()
    }

    /// Insert or replace a page under its own ID.
    pub fn insert(&mut self, page: StoryPage) -> Option<StoryPage> {
        self.pages.insert(page.id, page)
    }

    /// Append a page after the last one and link the previous last page to
    /// it, the way a new page continues the story.
    pub fn push(&mut self, title: impl Into<String>, content: impl Into<String>) -> PageId {
        let id = self.last_id().map_or(1, |last| last + 1);
        if let Some(previous) = self.pages.get_mut(&(id - 1)) {
            if previous.next_pages.is_empty() {
                previous.next_pages.push(id);
            }
        }
        self.pages.insert(id, StoryPage::new(id, title, content));
        id
    }

    /// The page a reader reaches by continuing from `id`.
    pub fn next_of(&self, id: PageId) -> Option<PageId> {
        let page = self.pages.get(&id)?;
        page.next_pages
            .iter()
            .copied()
            .find(|next| self.pages.contains_key(next))
    }

    /// Delete pages and close the gaps they leave.
    ///
    /// Every later page moves down by the number of deleted pages before it,
    /// and every `next_pages` list drops links to deleted pages and follows
    /// the renumbering. Returns the deleted pages with their old IDs.
    pub fn delete_pages(&mut self, ids: &[PageId]) -> Vec<StoryPage> {
        let mut deleted: Vec<PageId> = ids
            .iter()
            .copied()
            .filter(|id| self.pages.contains_key(id))
            .collect();
        deleted.sort_unstable();
        deleted.dedup();
        if deleted.is_empty() {
            return Vec::new();
        }

        let remap = |id: PageId| -> Option<PageId> {
            match deleted.binary_search(&id) {
                Ok(_) => None,
                Err(shift) => Some(id - shift as PageId),
            }
        };

        let mut removed = Vec::with_capacity(deleted.len());
        let mut pages = BTreeMap::new();
        for (id, mut page) in std::mem::take(&mut self.pages) {
            match remap(id) {
                None => removed.push(page),
                Some(new_id) => {
                    page.id = new_id;
                    page.next_pages = page.next_pages.iter().copied().filter_map(remap).collect();
                    pages.insert(new_id, page);
                }
            }
        }
        self.pages = pages;

        debug!(deleted = ?deleted, remaining = self.pages.len(), "Deleted story pages");
        removed
    }
}

impl FromIterator<StoryPage> for StoryPageRecord {
    fn from_iter<I: IntoIterator<Item = StoryPage>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().map(|page| (page.id, page)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(count: PageId) -> StoryPageRecord {
        let mut record = StoryPageRecord::new();
        for id in 1..=count {
            record.push(format!("Page {id}"), format!("[b]{id}[/b]"));
        }
        record
    }

    #[test]
    fn test_push_links_pages() {
        let record = story(3);
        assert_eq!(record.get(1).unwrap().next_pages, vec![2]);
        assert_eq!(record.get(2).unwrap().next_pages, vec![3]);
        assert!(record.get(3).unwrap().next_pages.is_empty());
        assert_eq!(record.next_of(1), Some(2));
        assert_eq!(record.next_of(3), None);
    }

    #[test]
    fn test_delete_renumbers_and_rewrites_links() {
        let mut record = story(4);
        record.pages.get_mut(&1).unwrap().next_pages = vec![2, 4];

        let removed = record.delete_pages(&[2]);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].title, "Page 2");

        assert_eq!(record.len(), 3);
        assert_eq!(record.get(2).unwrap().title, "Page 3");
        assert_eq!(record.get(3).unwrap().title, "Page 4");
        assert_eq!(record.get(2).unwrap().id, 2);
        assert_eq!(record.get(1).unwrap().next_pages, vec![3]);
        assert_eq!(record.get(2).unwrap().next_pages, vec![3]);
    }

    #[test]
    fn test_delete_several_pages() {
        let mut record = story(6);
        record.pages.get_mut(&6).unwrap().next_pages = vec![1, 3, 5];

        let removed = record.delete_pages(&[5, 2, 2, 9]);
        assert_eq!(removed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 5]);
        let titles: Vec<_> = record.pages().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Page 1", "Page 3", "Page 4", "Page 6"]);
        assert_eq!(record.get(4).unwrap().next_pages, vec![1, 2]);
        assert_eq!(record.get(3).unwrap().next_pages, Vec::<PageId>::new());
    }

    #[test]
    fn test_delete_nothing() {
        let mut record = story(2);
        assert!(record.delete_pages(&[7]).is_empty());
        assert_eq!(record, story(2));
    }
}
