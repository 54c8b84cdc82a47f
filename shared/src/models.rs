use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Outcome of the most recent sync attempt for a calendar connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Last sync fetched, parsed and reconciled the feed
    Connected,
    /// Last sync failed at the fetch or parse stage
    Error,
    /// Never synced, or the feed URL changed since the last sync
    Unsynced,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Connected => "connected",
            SyncStatus::Error => "error",
            SyncStatus::Unsynced => "unsynced",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected" => Ok(SyncStatus::Connected),
            "error" => Ok(SyncStatus::Error),
            "unsynced" => Ok(SyncStatus::Unsynced),
            other => Err(format!("unknown sync status: {}", other)),
        }
    }
}

/// A blocked stay read from an external calendar feed.
///
/// `start` is inclusive and `end` is exclusive, following the iCalendar
/// convention for all-day events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEvent {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub summary: String,
}

/// An external calendar feed registered by a host for one of their properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConnection {
    pub id: Uuid,
    /// None until the connection is attached to a published property
    pub property_id: Option<Uuid>,
    pub url: String,
    pub label: String,
    pub sync_status: SyncStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Events the remote feed reported on the last successful sync
    pub blocked_dates: Vec<BlockEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-property, per-date availability row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub id: Uuid,
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub is_available: bool,
    pub is_gap_night: bool,
    /// Nightly rate in minor currency units
    pub nightly_rate: i32,
    /// Gap night discount in percent
    pub gap_night_discount: i32,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Result of syncing a single calendar connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub connection_id: Uuid,
    pub property_id: Option<Uuid>,
    pub label: String,
    pub success: bool,
    pub events_found: usize,
    pub dates_blocked: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    pub fn failed(connection: &CalendarConnection, error: impl Into<String>) -> Self {
        SyncResult {
            connection_id: connection.id,
            property_id: connection.property_id,
            label: connection.label.clone(),
            success: false,
            events_found: 0,
            dates_blocked: 0,
            error: Some(error.into()),
        }
    }
}

/// Aggregate outcome of a batch sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<SyncResult>,
}

impl SyncSummary {
    pub fn push(&mut self, result: SyncResult) {
        self.total += 1;
        if result.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }
}
