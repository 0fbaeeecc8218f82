//! Daily API quota tracking with a safety threshold.
//!
//! A fetch may spend units only while `used + cost <= daily_limit - safety_threshold`.
//! The window is the calendar day in the configured time zone; `used` resets when
//! the day changes.

mod clock;
mod persist;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use clock::{Clock, SystemClock};

/// Snapshot of the current quota window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub used_units: u64,
    pub daily_limit: u64,
    pub safety_threshold: u64,
    pub window_start: NaiveDate,
}

impl QuotaState {
    /// Units that may be spent per window: `daily_limit - safety_threshold`.
    pub fn budget(&self) -> u64 {
        self.daily_limit.saturating_sub(self.safety_threshold)
    }

    /// Units still spendable in this window.
    pub fn remaining(&self) -> u64 {
        self.budget().saturating_sub(self.used_units)
    }
}

pub struct QuotaTracker {
    state: Mutex<QuotaState>,
    tz: Tz,
    clock: Arc<dyn Clock>,
}

impl QuotaTracker {
    pub fn new(daily_limit: u64, safety_threshold: u64, tz: Tz) -> Self {
        Self::with_clock(daily_limit, safety_threshold, tz, Arc::new(SystemClock))
    }

    pub fn with_clock(
        daily_limit: u64,
        safety_threshold: u64,
        tz: Tz,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let window_start = clock.now().with_timezone(&tz).date_naive();
        Self {
            state: Mutex::new(QuotaState {
                used_units: 0,
                daily_limit,
                safety_threshold,
                window_start,
            }),
            tz,
            clock,
        }
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.tz).date_naive()
    }

    /// Locked state, rolled over to today's window if the day changed.
    fn current(&self) -> MutexGuard<'_, QuotaState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let today = self.today();
        if state.window_start != today {
            tracing::info!(
                previous = %state.window_start,
                today = %today,
                used = state.used_units,
                "quota window rolled over"
            );
            state.window_start = today;
            state.used_units = 0;
        }
        state
    }

    /// Atomically check `used + cost <= limit - threshold` and, if it holds, add `cost`.
    pub fn reserve(&self, cost: u64) -> bool {
        let mut state = self.current();
        let Some(after) = state.used_units.checked_add(cost) else {
            return false;
        };
        if after > state.budget() {
            tracing::debug!(cost, used = state.used_units, budget = state.budget(), "quota reservation refused");
            return false;
        }
        state.used_units = after;
        true
    }

    /// Replace a reservation by the units actually spent.
    pub fn commit(&self, reserved: u64, actual: u64) {
        let mut state = self.current();
        state.used_units = state.used_units.saturating_sub(reserved).saturating_add(actual);
    }

    /// Give a reservation back unused.
    pub fn release(&self, reserved: u64) {
        let mut state = self.current();
        state.used_units = state.used_units.saturating_sub(reserved);
    }

    pub fn current_window(&self) -> QuotaState {
        self.current().clone()
    }

    /// Guarded reservation: released on drop unless committed.
    pub fn try_reserve(&self, cost: u64) -> Option<QuotaReservation<'_>> {
        let mut state = self.current();
        let after = state.used_units.checked_add(cost)?;
        if after > state.budget() {
            return None;
        }
        state.used_units = after;
        Some(QuotaReservation {
            tracker: self,
            reserved: cost,
            window: state.window_start,
            settled: false,
        })
    }

    /// Apply a settlement only if the reservation belongs to the current window.
    fn settle(&self, window: NaiveDate, reserved: u64, actual: u64) {
        let mut state = self.current();
        if state.window_start != window {
            tracing::debug!(%window, "reservation from a previous quota window dropped");
            return;
        }
        state.used_units = state.used_units.saturating_sub(reserved).saturating_add(actual);
    }
}

/// Outstanding reservation. Dropping it without `commit` releases the units.
#[must_use = "dropping a reservation releases it"]
pub struct QuotaReservation<'a> {
    tracker: &'a QuotaTracker,
    reserved: u64,
    window: NaiveDate,
    settled: bool,
}

impl QuotaReservation<'_> {
    pub fn reserved(&self) -> u64 {
        self.reserved
    }

    /// Charge `actual` units instead of the reservation.
    pub fn commit(mut self, actual: u64) {
        self.tracker.settle(self.window, self.reserved, actual);
        self.settled = true;
    }
}

impl Drop for QuotaReservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.tracker.settle(self.window, self.reserved, 0);
        }
    }
}
