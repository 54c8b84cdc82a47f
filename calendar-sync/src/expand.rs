//! Turning blocked stays into individual nights.

use chrono::{Days, NaiveDate};
use shared::BlockEvent;
use std::collections::BTreeSet;

/// Inclusive window of dates the engine is willing to write.
///
/// Past dates are pointless to block; dates beyond the horizon are dropped
/// to bound growth from open-ended feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl Horizon {
    pub fn starting(today: NaiveDate, days: u32) -> Self {
        let last = today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        Self { first: today, last }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first <= date && date <= self.last
    }
}

/// Nights blocked by one event within the horizon.
///
/// `end` is exclusive: a stay from the 15th to the 17th blocks the 15th and
/// 16th only.
pub fn blocked_nights(event: &BlockEvent, horizon: &Horizon) -> Vec<NaiveDate> {
    let from = event.start.max(horizon.first);

    from.iter_days()
        .take_while(|date| *date < event.end && horizon.contains(*date))
        .collect()
}

/// Distinct nights blocked by a whole feed, plus how many in-feed nights
/// were dropped for falling after the horizon.
pub fn expand_events(events: &[BlockEvent], horizon: &Horizon) -> (BTreeSet<NaiveDate>, usize) {
    let mut dates = BTreeSet::new();
    let mut beyond_horizon = 0;

    for event in events {
        dates.extend(blocked_nights(event, horizon));

        if event.end > horizon.last {
            let first_dropped = event.start.max(horizon.last.succ_opt().unwrap_or(horizon.last));
            beyond_horizon += (event.end - first_dropped).num_days().max(0) as usize;
        }
    }

    (dates, beyond_horizon)
}
