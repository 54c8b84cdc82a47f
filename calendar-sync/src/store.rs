//! Storage traits the sync engine is written against.
//!
//! The engine only needs a narrow slice of the marketplace schema: read and
//! update calendar connections, look up and upsert availability rows, and
//! read base nightly rates. `PgSyncStore` implements all three over
//! Postgres; tests use an in-memory implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::{AvailabilityRecord, BlockEvent, CalendarConnection};
use std::collections::HashMap;
use uuid::Uuid;

/// Calendar connections as seen by the sync engine.
///
/// The engine never creates or deletes connections.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Every connection attached to a property.
    async fn list_attached(&self) -> Result<Vec<CalendarConnection>>;

    /// Connections attached to one property.
    async fn list_for_property(&self, property_id: Uuid) -> Result<Vec<CalendarConnection>>;

    async fn get_connection(&self, connection_id: Uuid) -> Result<Option<CalendarConnection>>;

    /// Mark connected, stamp `last_sync_at`, clear the error and keep the
    /// parsed events for display.
    async fn record_sync_success(
        &self,
        connection_id: Uuid,
        events: &[BlockEvent],
        synced_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Mark errored with a message. `last_sync_at` is left alone so
    /// staleness stays visible.
    async fn record_sync_failure(
        &self,
        connection_id: Uuid,
        error: &str,
        failed_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// A blocked night to insert when no row exists for the date yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlockedNight {
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub nightly_rate: i32,
    pub note: String,
    pub updated_at: DateTime<Utc>,
}

/// Per-date availability rows.
///
/// There is no delete and no way to mark a date available.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn find_availability(
        &self,
        property_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityRecord>>;

    /// Set availability and gap night off and replace the note. Rate and
    /// discount are not touched.
    async fn block_existing(
        &self,
        record_id: Uuid,
        note: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Insert an unavailable, non-gap night with zero discount.
    async fn insert_blocked(&self, night: NewBlockedNight) -> Result<()>;
}

/// Read-only view of properties.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Base nightly rates keyed by property id. Unknown ids are absent.
    async fn base_rates(&self, property_ids: &[Uuid]) -> Result<HashMap<Uuid, i32>>;
}

/// Everything the engine needs from storage.
pub trait SyncStore: ConnectionStore + AvailabilityStore + PropertyStore {}

impl<T> SyncStore for T where T: ConnectionStore + AvailabilityStore + PropertyStore {}
