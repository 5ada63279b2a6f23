//! Core business logic module
//!
//! This module contains the reconciliation and realtime components:
//! - `traits` - Collaborator abstractions for the external boundary
//! - `arqueo` - Cash reconciliation session state machine
//! - `cache` - Locally cached drawer state
//! - `reconciler` - Realtime event reconciliation
//! - `notify` - Bounded-retry notification queue

pub mod arqueo;
pub mod cache;
pub mod notify;
pub mod reconciler;
pub mod traits;

pub use arqueo::{ArqueoPhase, ArqueoSession, ArqueoVerdict};
pub use cache::DrawerCache;
pub use notify::{DeliveryState, NotificationQueue, QueuedNotification};
pub use reconciler::{Directive, EventReconciler, Notice, NoticeKind, Outcome};
pub use traits::{LedgerGateway, NotificationTransport, SnapshotSource};
