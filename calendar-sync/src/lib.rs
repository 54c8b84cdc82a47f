//! External calendar sync for property availability.
//!
//! Hosts register iCalendar feeds from other booking platforms; this crate
//! fetches those feeds, reads the blocked stays out of them and marks the
//! corresponding nights unavailable.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod expand;
pub mod fetcher;
pub mod ical;
pub mod json_text;
pub mod models;
pub mod reconciler;
pub mod scheduler;
pub mod schema;
pub mod store;

pub use config::{DatabaseConfig, SyncConfig};
pub use engine::{preview_feed, FeedPreview, SyncEngine};
pub use error::{FetchError, ParseError, SyncError};
pub use fetcher::{FeedFetcher, HttpFeedFetcher};
pub use scheduler::SyncScheduler;
pub use store::{AvailabilityStore, ConnectionStore, PropertyStore, SyncStore};

/// Engine wired to Postgres and HTTP, as used by the binaries
pub type PgSyncEngine = SyncEngine<db::PgSyncStore, HttpFeedFetcher>;
