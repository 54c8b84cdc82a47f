#![allow(dead_code)]

use async_trait::async_trait;
use calendar_sync::engine::Clock;
use calendar_sync::store::NewBlockedNight;
use calendar_sync::{
    AvailabilityStore, ConnectionStore, FeedFetcher, FetchError, PropertyStore, SyncConfig,
    SyncEngine,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use shared::{AvailabilityRecord, BlockEvent, CalendarConnection, SyncStatus};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

/// Pinned "now" for every engine built here: 2026-03-01 12:00 UTC
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn fixed_clock() -> Clock {
    Arc::new(now)
}

/// Build a VCALENDAR body with one all-day VEVENT per (start, end, summary)
pub fn feed(events: &[(&str, &str, &str)]) -> String {
    let mut body = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//EN\r\n");
    for (i, (start, end, summary)) in events.iter().enumerate() {
        body.push_str("BEGIN:VEVENT\r\n");
        body.push_str(&format!("UID:event-{}@test\r\n", i));
        body.push_str(&format!("DTSTART;VALUE=DATE:{}\r\n", start));
        body.push_str(&format!("DTEND;VALUE=DATE:{}\r\n", end));
        body.push_str(&format!("SUMMARY:{}\r\n", summary));
        body.push_str("END:VEVENT\r\n");
    }
    body.push_str("END:VCALENDAR\r\n");
    body
}

pub fn connection(property_id: Option<Uuid>, url: &str, label: &str) -> CalendarConnection {
    CalendarConnection {
        id: Uuid::new_v4(),
        property_id,
        url: url.to_string(),
        label: label.to_string(),
        sync_status: SyncStatus::Unsynced,
        last_sync_at: None,
        last_error: None,
        blocked_dates: vec![],
        created_at: now(),
        updated_at: now(),
    }
}

#[derive(Default)]
struct State {
    connections: Vec<CalendarConnection>,
    availability: HashMap<(Uuid, NaiveDate), AvailabilityRecord>,
    rates: HashMap<Uuid, i32>,
    failing_dates: HashSet<NaiveDate>,
    rates_unavailable: bool,
}

/// In-memory implementation of every store trait
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn add_connection(&self, connection: CalendarConnection) -> Uuid {
        let id = connection.id;
        self.state.lock().unwrap().connections.push(connection);
        id
    }

    pub fn set_rate(&self, property_id: Uuid, rate: i32) {
        self.state.lock().unwrap().rates.insert(property_id, rate);
    }

    pub fn add_availability(
        &self,
        property_id: Uuid,
        date: NaiveDate,
        rate: i32,
        discount: i32,
    ) -> AvailabilityRecord {
        let record = AvailabilityRecord {
            id: Uuid::new_v4(),
            property_id,
            date,
            is_available: true,
            is_gap_night: true,
            nightly_rate: rate,
            gap_night_discount: discount,
            note: None,
            updated_at: now() - chrono::Duration::days(30),
        };
        self.state
            .lock()
            .unwrap()
            .availability
            .insert((property_id, date), record.clone());
        record
    }

    /// Make every write for this date fail
    pub fn fail_writes_on(&self, date: NaiveDate) {
        self.state.lock().unwrap().failing_dates.insert(date);
    }

    /// Make every base rate lookup fail
    pub fn fail_rate_lookups(&self) {
        self.state.lock().unwrap().rates_unavailable = true;
    }

    pub fn connection(&self, id: Uuid) -> CalendarConnection {
        self.state
            .lock()
            .unwrap()
            .connections
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .unwrap()
    }

    pub fn record(&self, property_id: Uuid, date: NaiveDate) -> Option<AvailabilityRecord> {
        self.state
            .lock()
            .unwrap()
            .availability
            .get(&(property_id, date))
            .cloned()
    }

    /// Sorted dates marked unavailable for a property
    pub fn blocked_dates(&self, property_id: Uuid) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .state
            .lock()
            .unwrap()
            .availability
            .values()
            .filter(|r| r.property_id == property_id && !r.is_available)
            .map(|r| r.date)
            .collect();
        dates.sort();
        dates
    }

    pub fn records_for(&self, property_id: Uuid) -> Vec<AvailabilityRecord> {
        let mut records: Vec<AvailabilityRecord> = self
            .state
            .lock()
            .unwrap()
            .availability
            .values()
            .filter(|r| r.property_id == property_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.date);
        records
    }

    fn update_connection(&self, id: Uuid, f: impl FnOnce(&mut CalendarConnection)) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        let connection = state
            .connections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow::anyhow!("connection {} not found", id))?;
        f(connection);
        Ok(())
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn list_attached(&self) -> anyhow::Result<Vec<CalendarConnection>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .connections
            .iter()
            .filter(|c| c.property_id.is_some())
            .cloned()
            .collect())
    }

    async fn list_for_property(&self, property_id: Uuid) -> anyhow::Result<Vec<CalendarConnection>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .connections
            .iter()
            .filter(|c| c.property_id == Some(property_id))
            .cloned()
            .collect())
    }

    async fn get_connection(&self, connection_id: Uuid) -> anyhow::Result<Option<CalendarConnection>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .connections
            .iter()
            .find(|c| c.id == connection_id)
            .cloned())
    }

    async fn record_sync_success(
        &self,
        connection_id: Uuid,
        events: &[BlockEvent],
        synced_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.update_connection(connection_id, |c| {
            c.sync_status = SyncStatus::Connected;
            c.last_sync_at = Some(synced_at);
            c.last_error = None;
            c.blocked_dates = events.to_vec();
            c.updated_at = synced_at;
        })
    }

    async fn record_sync_failure(
        &self,
        connection_id: Uuid,
        error: &str,
        failed_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.update_connection(connection_id, |c| {
            c.sync_status = SyncStatus::Error;
            c.last_error = Some(error.to_string());
            c.updated_at = failed_at;
        })
    }
}

#[async_trait]
impl AvailabilityStore for MemoryStore {
    async fn find_availability(
        &self,
        property_id: Uuid,
        date: NaiveDate,
    ) -> anyhow::Result<Option<AvailabilityRecord>> {
        Ok(self.record(property_id, date))
    }

    async fn block_existing(
        &self,
        record_id: Uuid,
        note: &str,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        let failing = state.failing_dates.clone();
        let record = state
            .availability
            .values_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| anyhow::anyhow!("availability {} not found", record_id))?;
        if failing.contains(&record.date) {
            anyhow::bail!("simulated write failure for {}", record.date);
        }
        record.is_available = false;
        record.is_gap_night = false;
        record.note = Some(note.to_string());
        record.updated_at = updated_at;
        Ok(())
    }

    async fn insert_blocked(&self, night: NewBlockedNight) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_dates.contains(&night.date) {
            anyhow::bail!("simulated write failure for {}", night.date);
        }
        if state.availability.contains_key(&(night.property_id, night.date)) {
            anyhow::bail!("duplicate availability row for {}", night.date);
        }
        state.availability.insert(
            (night.property_id, night.date),
            AvailabilityRecord {
                id: Uuid::new_v4(),
                property_id: night.property_id,
                date: night.date,
                is_available: false,
                is_gap_night: false,
                nightly_rate: night.nightly_rate,
                gap_night_discount: 0,
                note: Some(night.note),
                updated_at: night.updated_at,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl PropertyStore for MemoryStore {
    async fn base_rates(&self, property_ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, i32>> {
        let state = self.state.lock().unwrap();
        if state.rates_unavailable {
            anyhow::bail!("connection pool exhausted");
        }
        Ok(property_ids
            .iter()
            .filter_map(|id| state.rates.get(id).map(|rate| (*id, *rate)))
            .collect())
    }
}

/// Canned response for a feed URL
#[derive(Clone)]
pub enum FeedResponse {
    Body(String),
    Fail(FetchError),
    Panic,
}

/// Serves canned responses keyed by URL
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, FeedResponse>>,
}

impl FakeFetcher {
    pub fn respond(&self, url: &str, response: FeedResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }
}

#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(FeedResponse::Body(body)) => Ok(body),
            Some(FeedResponse::Fail(e)) => Err(e),
            Some(FeedResponse::Panic) => panic!("feed handler bug"),
            None => Err(FetchError::Network(format!("no route to {}", url))),
        }
    }
}

/// Blocks inside `fetch` until released, to hold a sync in flight
pub struct GatedFetcher {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
    body: String,
}

impl GatedFetcher {
    pub fn new(body: String) -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
            body,
        }
    }
}

#[async_trait]
impl FeedFetcher for GatedFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.body.clone())
    }
}

pub fn engine<F: FeedFetcher>(
    store: Arc<MemoryStore>,
    fetcher: Arc<F>,
) -> SyncEngine<MemoryStore, F> {
    SyncEngine::new(store, fetcher, &SyncConfig::default()).with_clock(fixed_clock())
}
