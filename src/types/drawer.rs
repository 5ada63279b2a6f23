//! Drawer state types
//!
//! This module defines the locally cached view of the current drawer:
//! running aggregates updated by delta from real-time events, the full
//! snapshot form returned by the resynchronization fetch, and the
//! operations-blocked flag toggled by lock/unlock events.

use crate::types::DrawerId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Running aggregates for the current drawer
///
/// Counts are signed so that out-of-order delta pairs (a release arriving
/// before its reserve) converge instead of clamping.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawerTotals {
    /// Sum of manual drawer transactions (income positive, expense negative)
    pub transaction_total: Decimal,

    /// Number of manual drawer transactions
    pub transaction_count: i64,

    /// Sum of processed sales
    pub sales_total: Decimal,

    /// Units of stock currently reserved against open tickets
    pub reserved_stock: i64,
}

/// Full drawer state as returned by the resynchronization fetch
///
/// Received either from `GET /cajas/actual` after a (re)connect, or inline
/// on an event that carries an explicit snapshot. Applying a snapshot
/// replaces the cached state wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawerSnapshot {
    /// The drawer this snapshot describes, if one is open
    pub drawer: Option<DrawerId>,

    /// Whether the drawer is currently open
    pub open: bool,

    /// Running aggregates at snapshot time
    pub totals: DrawerTotals,

    /// Local-to-foreign exchange rate in effect
    pub exchange_rate: Decimal,
}

impl DrawerSnapshot {
    /// Snapshot of a site with no open drawer
    pub fn closed() -> Self {
        DrawerSnapshot {
            drawer: None,
            open: false,
            totals: DrawerTotals::default(),
            exchange_rate: Decimal::ZERO,
        }
    }
}

/// Operations-blocked flag with its human-readable reason
///
/// Lock and unlock events carry timestamps; the newer write wins so that
/// out-of-order delivery across reconnects converges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockState {
    /// Why operations are blocked, shown to the operator
    pub reason: String,

    /// Server-side timestamp of the lock event
    pub since: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_snapshot_is_empty() {
        let snapshot = DrawerSnapshot::closed();

        assert_eq!(snapshot.drawer, None);
        assert!(!snapshot.open);
        assert_eq!(snapshot.totals, DrawerTotals::default());
        assert_eq!(snapshot.exchange_rate, Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_roundtrips_through_json() {
        let snapshot = DrawerSnapshot {
            drawer: Some(12),
            open: true,
            totals: DrawerTotals {
                transaction_total: "125.50".parse().unwrap(),
                transaction_count: 4,
                sales_total: "980.00".parse().unwrap(),
                reserved_stock: 2,
            },
            exchange_rate: "36.61".parse().unwrap(),
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: DrawerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
