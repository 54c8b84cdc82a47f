//! Sync orchestration: fetch, parse, expand and reconcile one connection at a
//! time, and fold batches of connections into a summary.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use futures::{stream, FutureExt, StreamExt};
use shared::{BlockEvent, CalendarConnection, SyncResult, SyncSummary};
use std::any::Any;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::expand::{expand_events, Horizon};
use crate::fetcher::FeedFetcher;
use crate::ical::parse_feed;
use crate::reconciler::Reconciler;
use crate::store::SyncStore;

/// Source of the current time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub const ALREADY_IN_PROGRESS: &str = "sync already in progress";
pub const NOT_ATTACHED: &str = "connection is not attached to a property";

/// What a feed would block, without touching storage
#[derive(Debug, Clone)]
pub struct FeedPreview {
    pub events: Vec<BlockEvent>,
    pub dates: BTreeSet<NaiveDate>,
    pub beyond_horizon: usize,
}

/// Fetch, parse and expand a feed against a horizon
pub async fn preview_feed<F>(
    fetcher: &F,
    url: &str,
    horizon: &Horizon,
) -> Result<FeedPreview, SyncError>
where
    F: FeedFetcher + ?Sized,
{
    let raw = fetcher.fetch(url).await?;
    let events = parse_feed(&raw)?;
    let (dates, beyond_horizon) = expand_events(&events, horizon);

    Ok(FeedPreview {
        events,
        dates,
        beyond_horizon,
    })
}

pub struct SyncEngine<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
    horizon_days: u32,
    clock: Clock,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl<S, F> Clone for SyncEngine<S, F> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            horizon_days: self.horizon_days,
            clock: Arc::clone(&self.clock),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<S, F> SyncEngine<S, F>
where
    S: SyncStore,
    F: FeedFetcher,
{
    pub fn new(store: Arc<S>, fetcher: Arc<F>, config: &SyncConfig) -> Self {
        Self {
            store,
            fetcher,
            horizon_days: config.horizon_days,
            clock: Arc::new(Utc::now),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Replace the wall clock, mainly so tests can pin "today"
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn horizon(&self) -> Horizon {
        Horizon::starting(self.now().date_naive(), self.horizon_days)
    }

    /// Sync one connection against its property's default nightly rate.
    ///
    /// Never fails: every error becomes a failed `SyncResult`. Fetch and
    /// parse failures are also recorded on the connection.
    pub async fn sync_connection(
        &self,
        connection: &CalendarConnection,
        default_rate: i32,
    ) -> SyncResult {
        let Some(property_id) = connection.property_id else {
            return SyncResult::failed(connection, NOT_ATTACHED);
        };

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, connection.id) else {
            tracing::info!(
                connection_id = %connection.id,
                "Skipping sync of '{}': {}",
                connection.label,
                ALREADY_IN_PROGRESS
            );
            return SyncResult::failed(connection, ALREADY_IN_PROGRESS);
        };

        let span = tracing::info_span!(
            "calendar_sync",
            connection_id = %connection.id,
            property_id = %property_id
        );

        async {
            match self.run_stages(connection, property_id, default_rate).await {
                Ok(result) => {
                    tracing::info!(
                        "Synced '{}': {} events, {} dates blocked",
                        connection.label,
                        result.events_found,
                        result.dates_blocked
                    );
                    result
                }
                Err(e) => {
                    let message = e.to_string();
                    if e.is_feed_error() {
                        tracing::warn!("Sync of '{}' failed: {}", connection.label, message);
                        let reconciler = Reconciler::new(self.store.as_ref(), self.now());
                        if let Err(store_err) = reconciler.mark_failed(connection, &message).await
                        {
                            tracing::error!(
                                "Failed to record sync error on connection: {:#}",
                                store_err
                            );
                        }
                    } else {
                        tracing::error!("Sync of '{}' failed: {}", connection.label, message);
                    }
                    SyncResult::failed(connection, message)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        connection: &CalendarConnection,
        property_id: Uuid,
        default_rate: i32,
    ) -> Result<SyncResult, SyncError> {
        tracing::debug!("Fetching {}", connection.url);
        let raw = self.fetcher.fetch(&connection.url).await?;

        tracing::debug!("Parsing {} bytes", raw.len());
        let events = parse_feed(&raw)?;

        let (dates, beyond_horizon) = expand_events(&events, &self.horizon());
        if beyond_horizon > 0 {
            tracing::debug!(
                "Dropped {} nights beyond the {} day horizon",
                beyond_horizon,
                self.horizon_days
            );
        }

        tracing::debug!("Reconciling {} dates", dates.len());
        let reconciler = Reconciler::new(self.store.as_ref(), self.now());
        let outcome = reconciler
            .block_dates(property_id, &dates, default_rate, &connection.label)
            .await;
        if outcome.skipped > 0 {
            tracing::warn!("{} dates could not be written", outcome.skipped);
        }

        reconciler
            .mark_connected(connection, &events)
            .await
            .context("Failed to record sync success")?;

        Ok(SyncResult {
            connection_id: connection.id,
            property_id: Some(property_id),
            label: connection.label.clone(),
            success: true,
            events_found: events.len(),
            dates_blocked: outcome.written,
            error: None,
        })
    }

    /// Sync a single connection by id. `None` if it does not exist.
    pub async fn sync_connection_by_id(
        &self,
        connection_id: Uuid,
    ) -> anyhow::Result<Option<SyncResult>> {
        let Some(connection) = self
            .store
            .get_connection(connection_id)
            .await
            .context("Failed to load connection")?
        else {
            return Ok(None);
        };

        let property_ids: Vec<Uuid> = connection.property_id.into_iter().collect();
        let rates = match self.store.base_rates(&property_ids).await {
            Ok(rates) => rates,
            Err(e) => return Ok(Some(SyncResult::failed(&connection, rates_unavailable(&e)))),
        };

        let rate = default_rate_for(&rates, &connection);
        Ok(Some(self.sync_isolated(&connection, rate).await))
    }

    /// Sync every connection attached to a property
    pub async fn sync_all(&self) -> anyhow::Result<SyncSummary> {
        let connections = self
            .store
            .list_attached()
            .await
            .context("Failed to load calendar connections")?;

        self.run_batch(connections).await
    }

    /// Sync every connection of one property
    pub async fn sync_property(&self, property_id: Uuid) -> anyhow::Result<SyncSummary> {
        let connections = self
            .store
            .list_for_property(property_id)
            .await
            .context("Failed to load calendar connections")?;

        self.run_batch(connections).await
    }

    /// Sequential fold over the connections. A panic inside one connection's
    /// sync is caught and recorded as that connection's failure, and so is a
    /// failed base rate lookup.
    pub async fn run_batch(
        &self,
        connections: Vec<CalendarConnection>,
    ) -> anyhow::Result<SyncSummary> {
        let property_ids: Vec<Uuid> = connections
            .iter()
            .filter_map(|c| c.property_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        tracing::info!("Starting calendar sync for {} connections", connections.len());

        let rates = match self.store.base_rates(&property_ids).await {
            Ok(rates) => rates,
            Err(e) => {
                let message = rates_unavailable(&e);
                let mut summary = SyncSummary::default();
                for connection in &connections {
                    summary.push(SyncResult::failed(connection, message.as_str()));
                }
                return Ok(summary);
            }
        };

        let rates = &rates;
        let summary = stream::iter(connections)
            .fold(SyncSummary::default(), |mut summary, connection| async move {
                let rate = default_rate_for(rates, &connection);
                summary.push(self.sync_isolated(&connection, rate).await);
                summary
            })
            .await;

        tracing::info!(
            "Calendar sync finished: {} total, {} succeeded, {} failed",
            summary.total,
            summary.succeeded,
            summary.failed
        );

        Ok(summary)
    }

    /// `sync_connection` with a panic turned into that connection's failure
    async fn sync_isolated(&self, connection: &CalendarConnection, default_rate: i32) -> SyncResult {
        AssertUnwindSafe(self.sync_connection(connection, default_rate))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                tracing::error!(
                    connection_id = %connection.id,
                    "Sync panicked: {}",
                    message
                );
                SyncResult::failed(connection, message)
            })
    }
}

fn default_rate_for(rates: &HashMap<Uuid, i32>, connection: &CalendarConnection) -> i32 {
    let Some(property_id) = connection.property_id else {
        return 0;
    };

    match rates.get(&property_id) {
        Some(rate) => *rate,
        None => {
            tracing::warn!(
                %property_id,
                "No base nightly rate found, new nights will be priced at 0"
            );
            0
        }
    }
}

fn rates_unavailable(e: &anyhow::Error) -> String {
    tracing::error!("Failed to load base nightly rates: {:#}", e);
    format!("failed to load base nightly rates: {:#}", e)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("unexpected error: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("unexpected error: {}", s)
    } else {
        "unexpected error".to_string()
    }
}

/// Marks a connection as being synced until dropped
struct InFlightGuard {
    set: Arc<Mutex<HashSet<Uuid>>>,
    id: Uuid,
}

impl InFlightGuard {
    fn acquire(set: &Arc<Mutex<HashSet<Uuid>>>, id: Uuid) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);

        inserted.then(|| Self {
            set: Arc::clone(set),
            id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
