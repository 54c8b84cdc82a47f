//! Writes blocked nights into the availability store and records the
//! outcome on the originating connection.

use chrono::{DateTime, NaiveDate, Utc};
use shared::{BlockEvent, CalendarConnection};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::store::{AvailabilityStore, ConnectionStore, NewBlockedNight};

/// Counts from one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub written: usize,
    pub skipped: usize,
}

/// Note attached to every night blocked by a feed
pub fn sync_note(label: &str) -> String {
    format!("Blocked by {} calendar sync", label)
}

pub struct Reconciler<'a, S: ?Sized> {
    store: &'a S,
    now: DateTime<Utc>,
}

impl<'a, S> Reconciler<'a, S>
where
    S: AvailabilityStore + ConnectionStore + ?Sized,
{
    pub fn new(store: &'a S, now: DateTime<Utc>) -> Self {
        Self { store, now }
    }

    /// Block every date for the property. Existing rows keep their rate and
    /// discount; missing rows are inserted at `default_rate`. A failed write
    /// is logged and skipped.
    pub async fn block_dates(
        &self,
        property_id: Uuid,
        dates: &BTreeSet<NaiveDate>,
        default_rate: i32,
        label: &str,
    ) -> ReconcileOutcome {
        let note = sync_note(label);
        let mut outcome = ReconcileOutcome::default();

        for &date in dates {
            match self.block_one(property_id, date, default_rate, &note).await {
                Ok(()) => outcome.written += 1,
                Err(e) => {
                    tracing::warn!(
                        %property_id,
                        %date,
                        "Failed to block date, skipping: {:#}",
                        e
                    );
                    outcome.skipped += 1;
                }
            }
        }

        outcome
    }

    async fn block_one(
        &self,
        property_id: Uuid,
        date: NaiveDate,
        default_rate: i32,
        note: &str,
    ) -> anyhow::Result<()> {
        match self.store.find_availability(property_id, date).await? {
            Some(existing) => {
                self.store
                    .block_existing(existing.id, note, self.now)
                    .await
            }
            None => {
                self.store
                    .insert_blocked(NewBlockedNight {
                        property_id,
                        date,
                        nightly_rate: default_rate,
                        note: note.to_string(),
                        updated_at: self.now,
                    })
                    .await
            }
        }
    }

    pub async fn mark_connected(
        &self,
        connection: &CalendarConnection,
        events: &[BlockEvent],
    ) -> anyhow::Result<()> {
        self.store
            .record_sync_success(connection.id, events, self.now)
            .await
    }

    pub async fn mark_failed(
        &self,
        connection: &CalendarConnection,
        message: &str,
    ) -> anyhow::Result<()> {
        self.store
            .record_sync_failure(connection.id, message, self.now)
            .await
    }
}
