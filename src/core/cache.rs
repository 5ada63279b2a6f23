//! Local drawer-state cache
//!
//! This module provides the `DrawerCache`, the single locally held view of
//! the current drawer. It is mutated only by the event reconciler and by
//! the local user's own actions; every mutation is one synchronous state
//! update, so no partial interleaving is observable.
//!
//! Quantity mutations apply deltas with checked arithmetic. Counts are
//! signed and may go transiently negative so that out-of-order delta
//! pairs (a release before its reserve) still converge.

use crate::types::{DrawerId, DrawerSnapshot, DrawerTotals, LockState, RegisterError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Locally cached state of the current drawer
#[derive(Debug, Clone, Default)]
pub struct DrawerCache {
    drawer: Option<DrawerId>,
    open: bool,
    totals: DrawerTotals,
    exchange_rate: Decimal,
    rate_stamp: Option<DateTime<Utc>>,
    lock: Option<LockState>,
    lock_stamp: Option<DateTime<Utc>>,
}

impl DrawerCache {
    /// Create an empty cache with no open drawer
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently open drawer, if any
    pub fn drawer(&self) -> Option<DrawerId> {
        self.drawer
    }

    /// Whether a drawer is currently open
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Current running aggregates
    pub fn totals(&self) -> DrawerTotals {
        self.totals
    }

    /// Exchange rate in effect
    pub fn exchange_rate(&self) -> Decimal {
        self.exchange_rate
    }

    /// The operations-blocked flag, if set
    pub fn lock(&self) -> Option<&LockState> {
        self.lock.as_ref()
    }

    /// Whether operations are currently blocked
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Record a drawer opening
    ///
    /// Aggregates reset: a freshly opened drawer has no activity yet.
    pub fn open_drawer(&mut self, drawer: DrawerId) {
        self.drawer = Some(drawer);
        self.open = true;
        self.totals = DrawerTotals::default();
    }

    /// Record the drawer closing
    ///
    /// The drawer id is kept so late events for it remain attributable;
    /// only the open flag flips.
    pub fn close_drawer(&mut self) {
        self.open = false;
    }

    /// Apply a manual-transaction delta
    ///
    /// # Errors
    ///
    /// Returns an error if the running total would overflow; the cache is
    /// left unchanged.
    pub fn add_transaction(&mut self, amount: Decimal) -> Result<(), RegisterError> {
        let new_total = self
            .totals
            .transaction_total
            .checked_add(amount)
            .ok_or_else(|| RegisterError::arithmetic_overflow("add transaction"))?;
        let new_count = self
            .totals
            .transaction_count
            .checked_add(1)
            .ok_or_else(|| RegisterError::arithmetic_overflow("add transaction"))?;

        self.totals.transaction_total = new_total;
        self.totals.transaction_count = new_count;
        Ok(())
    }

    /// Reverse a manual-transaction delta
    ///
    /// # Errors
    ///
    /// Returns an error if the running total would overflow; the cache is
    /// left unchanged.
    pub fn remove_transaction(&mut self, amount: Decimal) -> Result<(), RegisterError> {
        let new_total = self
            .totals
            .transaction_total
            .checked_sub(amount)
            .ok_or_else(|| RegisterError::arithmetic_overflow("remove transaction"))?;
        let new_count = self
            .totals
            .transaction_count
            .checked_sub(1)
            .ok_or_else(|| RegisterError::arithmetic_overflow("remove transaction"))?;

        self.totals.transaction_total = new_total;
        self.totals.transaction_count = new_count;
        Ok(())
    }

    /// Add a processed sale to the running sales total
    pub fn record_sale(&mut self, amount: Decimal) -> Result<(), RegisterError> {
        self.totals.sales_total = self
            .totals
            .sales_total
            .checked_add(amount)
            .ok_or_else(|| RegisterError::arithmetic_overflow("record sale"))?;
        Ok(())
    }

    /// Apply a signed reserved-stock delta
    ///
    /// Positive for reservations, negative for releases. The count may go
    /// transiently negative when deltas arrive out of order.
    pub fn adjust_reserved_stock(&mut self, delta: i64) -> Result<(), RegisterError> {
        self.totals.reserved_stock = self
            .totals
            .reserved_stock
            .checked_add(delta)
            .ok_or_else(|| RegisterError::arithmetic_overflow("adjust reserved stock"))?;
        Ok(())
    }

    /// Update the exchange rate, last write wins
    ///
    /// A stamped update older than the one already applied is ignored so
    /// rates delivered out of order across reconnects converge. Unstamped
    /// updates always apply.
    ///
    /// # Returns
    ///
    /// `true` if the rate changed.
    pub fn set_exchange_rate(&mut self, rate: Decimal, stamp: Option<DateTime<Utc>>) -> bool {
        if is_stale(self.rate_stamp, stamp) {
            return false;
        }

        self.rate_stamp = stamp.or(self.rate_stamp);
        if self.exchange_rate == rate {
            return false;
        }
        self.exchange_rate = rate;
        true
    }

    /// Set the operations-blocked flag, last write wins
    ///
    /// Locking while already locked updates the reason without
    /// duplicating state.
    ///
    /// # Returns
    ///
    /// `true` if the flag or reason changed.
    pub fn apply_lock(&mut self, reason: &str, stamp: Option<DateTime<Utc>>) -> bool {
        if is_stale(self.lock_stamp, stamp) {
            return false;
        }

        self.lock_stamp = stamp.or(self.lock_stamp);
        let changed = self
            .lock
            .as_ref()
            .map(|lock| lock.reason != reason)
            .unwrap_or(true);

        self.lock = Some(LockState {
            reason: reason.to_string(),
            since: stamp.unwrap_or_else(Utc::now),
        });
        changed
    }

    /// Clear the operations-blocked flag, last write wins
    ///
    /// Unlocking while already unlocked is a no-op.
    ///
    /// # Returns
    ///
    /// `true` if the flag was cleared.
    pub fn apply_unlock(&mut self, stamp: Option<DateTime<Utc>>) -> bool {
        if is_stale(self.lock_stamp, stamp) {
            return false;
        }

        self.lock_stamp = stamp.or(self.lock_stamp);
        self.lock.take().is_some()
    }

    /// Replace the whole cached state from a full snapshot
    ///
    /// Used after every (re)connect and whenever an event carries an
    /// explicit snapshot; the lock flag is independent of drawer state
    /// and survives the replace.
    pub fn replace(&mut self, snapshot: &DrawerSnapshot) {
        self.drawer = snapshot.drawer;
        self.open = snapshot.open;
        self.totals = snapshot.totals;
        self.exchange_rate = snapshot.exchange_rate;
    }

    /// Export the cached state as a snapshot
    pub fn snapshot(&self) -> DrawerSnapshot {
        DrawerSnapshot {
            drawer: self.drawer,
            open: self.open,
            totals: self.totals,
            exchange_rate: self.exchange_rate,
        }
    }
}

/// Whether an incoming stamped write is older than the applied one
///
/// Unstamped writes are never stale; an unstamped applied state never
/// rejects a stamped write.
fn is_stale(applied: Option<DateTime<Utc>>, incoming: Option<DateTime<Utc>>) -> bool {
    match (applied, incoming) {
        (Some(applied), Some(incoming)) => incoming < applied,
        _ => false,
    }
}
