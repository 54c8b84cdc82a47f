// Database models for Diesel
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use shared::{AvailabilityRecord, BlockEvent, CalendarConnection, SyncStatus};
use uuid::Uuid;

use crate::json_text::JsonText;

/// Database representation of calendar_connections
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::calendar_connections)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConnectionRow {
    pub id: Uuid,
    pub property_id: Option<Uuid>,
    pub url: String,
    pub label: String,
    pub sync_status: String,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub blocked_dates: JsonText<Vec<BlockEvent>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConnectionRow> for CalendarConnection {
    fn from(row: ConnectionRow) -> Self {
        let sync_status = row.sync_status.parse().unwrap_or_else(|e| {
            tracing::warn!("Connection {}: {}, treating as unsynced", row.id, e);
            SyncStatus::Unsynced
        });

        CalendarConnection {
            id: row.id,
            property_id: row.property_id,
            url: row.url,
            label: row.label,
            sync_status,
            last_sync_at: row.last_sync_at,
            last_error: row.last_error,
            blocked_dates: row.blocked_dates.into_inner(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insertable struct for a newly registered feed
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::calendar_connections)]
pub struct NewConnection {
    pub property_id: Option<Uuid>,
    pub url: String,
    pub label: String,
    pub sync_status: String,
    pub blocked_dates: JsonText<Vec<BlockEvent>>,
}

/// Host edits to a connection; `None` fields are left unchanged
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = crate::schema::calendar_connections)]
pub struct ConnectionChanges {
    pub property_id: Option<Uuid>,
    pub url: Option<String>,
    pub label: Option<String>,
    pub sync_status: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Database representation of availability
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::availability)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AvailabilityRow {
    pub id: Uuid,
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub is_available: bool,
    pub is_gap_night: bool,
    pub nightly_rate: i32,
    pub gap_night_discount: i32,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<AvailabilityRow> for AvailabilityRecord {
    fn from(row: AvailabilityRow) -> Self {
        AvailabilityRecord {
            id: row.id,
            property_id: row.property_id,
            date: row.date,
            is_available: row.is_available,
            is_gap_night: row.is_gap_night,
            nightly_rate: row.nightly_rate,
            gap_night_discount: row.gap_night_discount,
            note: row.note,
            updated_at: row.updated_at,
        }
    }
}

/// Insertable struct for a night blocked by calendar sync
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::availability)]
pub struct NewAvailability {
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub is_available: bool,
    pub is_gap_night: bool,
    pub nightly_rate: i32,
    pub gap_night_discount: i32,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}
