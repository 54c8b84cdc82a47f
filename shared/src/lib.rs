//! Types shared between the calendar sync engine and the HTTP backend.

pub mod api;
pub mod models;

pub use models::{
    AvailabilityRecord, BlockEvent, CalendarConnection, SyncResult, SyncStatus, SyncSummary,
};
