//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `money`: Instruments, amount triples, and financial rounding
//! - `adjustment`: Compensating ledger-entry types
//! - `drawer`: Cached drawer state and snapshots
//! - `event`: Realtime event union and wire parsing
//! - `error`: Error types for the cash-register engine

pub mod adjustment;
pub mod drawer;
pub mod error;
pub mod event;
pub mod money;

pub use adjustment::{AdjustmentDirection, LedgerAdjustment};
pub use drawer::{DrawerSnapshot, DrawerTotals, LockState};
pub use error::RegisterError;
pub use event::{parse_wire_event, EventEnvelope, RegisterEvent, WireEvent};
pub use money::{
    discrepancy_tolerance, round_money, CountInput, DrawerId, Instrument, InstrumentAmounts,
    MONEY_SCALE,
};
