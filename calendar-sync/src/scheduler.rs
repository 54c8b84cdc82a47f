use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::engine::SyncEngine;
use crate::fetcher::FeedFetcher;
use crate::store::SyncStore;

/// Runs the batch sync on a fixed interval
pub struct SyncScheduler<S, F> {
    engine: SyncEngine<S, F>,
    interval: Duration,
}

impl<S, F> SyncScheduler<S, F>
where
    S: SyncStore + 'static,
    F: FeedFetcher + 'static,
{
    pub fn new(engine: SyncEngine<S, F>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Loop forever. The first batch runs immediately; a slow batch delays
    /// the next tick instead of bunching them up.
    pub async fn run(&self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Calendar sync scheduler started (interval: {:?})", self.interval);

        loop {
            ticker.tick().await;
            tracing::debug!("Running calendar sync cycle");

            if let Err(e) = self.engine.sync_all().await {
                tracing::error!("Calendar sync cycle failed: {:#}", e);
                // Continue on the next tick
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
