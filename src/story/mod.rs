//! Story pages and their storage

pub mod database;
pub mod record;

pub use database::{PageDatabase, StoreError, StoreResult, StoryId, StorySummary};
pub use record::{PageId, StoryPage, StoryPageRecord};
