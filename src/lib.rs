//! Register Engine Library
//! # Overview
//!
//! This library implements the engine behind a retail point-of-sale
//! cash-register front-end: drawer reconciliation ("arqueo") across
//! three value instruments, realtime convergence of the locally cached
//! drawer state against a server-pushed event stream, and the REST /
//! WebSocket boundary those pieces talk through.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (instruments, adjustments, events, errors)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::arqueo`] - Cash reconciliation session state machine
//!   - [`core::reconciler`] - Realtime event reconciliation
//!   - [`core::cache`] - Locally cached drawer state
//!   - [`core::notify`] - Bounded-retry notification queue
//! - [`io`] - CSV handling for batch count-sheet processing
//! - [`net`] - REST client and reconnecting WebSocket transport
//! - [`live`] - The live session service tying transport, reconciler,
//!   and resynchronization together
//! - [`strategy`] - Batch processing with pluggable sync/async strategies
//!
//! # Reconciliation
//!
//! A reconciliation session compares counted against expected amounts in
//! three instruments (local cash, foreign cash, mobile balance):
//!
//! - **Balanced**: every difference within 0.01; completes with no
//!   ledger adjustments
//! - **Discrepant**: blocks until a supervisor authorizes; produces one
//!   compensating adjustment per discrepant instrument, posted to the
//!   ledger atomically as a batch
//!
//! # Realtime convergence
//!
//! The event reconciler applies server-pushed events to the cached
//! drawer state: deltas are de-duplicated, the user's own echoed actions
//! are suppressed in favor of a refresh fetch, flags converge
//! last-write-wins, and every reconnect triggers a full
//! resynchronization.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod live;
pub mod net;
pub mod strategy;
pub mod types;

pub use crate::core::{
    ArqueoPhase, ArqueoSession, ArqueoVerdict, DeliveryState, DrawerCache, EventReconciler,
    NotificationQueue,
};
pub use io::write_adjustments_csv;
pub use live::RegisterSession;
pub use net::{Endpoints, EventSocket, RestClient, TransportUpdate};
pub use types::{
    CountInput, DrawerId, DrawerSnapshot, EventEnvelope, Instrument, InstrumentAmounts,
    LedgerAdjustment, RegisterError, RegisterEvent,
};
