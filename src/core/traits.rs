//! Collaborator traits for the external boundary
//!
//! This module defines the trait abstractions behind which the backend
//! collaborators live, so the core can be driven against in-memory
//! implementations in tests and against the REST client in production.

use crate::types::{DrawerSnapshot, LedgerAdjustment, RegisterError};

/// Trait for the external ledger collaborator
///
/// The ledger persists compensating adjustment entries. Posting is
/// all-or-nothing: an implementation must only return `Ok` once every
/// adjustment in the batch is durably accepted; partial application is a
/// hard failure.
pub trait LedgerGateway {
    /// Post a batch of adjustments atomically
    fn post_adjustments(
        &self,
        batch: &[LedgerAdjustment],
    ) -> impl std::future::Future<Output = Result<(), RegisterError>> + Send;
}

/// Trait for the side-channel notification transport
///
/// Delivery failures are non-fatal to the enclosing workflow; the caller
/// keeps the record in a bounded retry queue.
pub trait NotificationTransport {
    /// Deliver one notification to one recipient
    fn deliver(
        &self,
        recipient: &str,
        message: &str,
    ) -> impl std::future::Future<Output = Result<(), RegisterError>> + Send;
}

/// Trait for the resynchronization source
///
/// After every (re)connect, and whenever an event directs a refresh, the
/// session fetches a full drawer snapshot rather than trusting the local
/// cache.
pub trait SnapshotSource {
    /// Fetch the current full drawer snapshot
    fn fetch_drawer_snapshot(
        &self,
    ) -> impl std::future::Future<Output = Result<DrawerSnapshot, RegisterError>> + Send;
}
