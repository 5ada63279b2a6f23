//! Bounded-retry notification queue
//!
//! Side-channel notifications (WhatsApp operator messages) must never
//! block the primary workflow: a failed send keeps its record in this
//! queue and is retried a bounded number of times. The lifecycle is an
//! explicit state machine rather than a mutable array with ad-hoc
//! counters:
//!
//! ```text
//! Pending ──(fail)──▶ Retrying(1) ──(fail)──▶ ... ──(fail)──▶ Exhausted
//!    │                     │
//!    └──────(delivered)────┴────▶ Delivered
//! ```

use crate::core::traits::NotificationTransport;
use tracing::warn;
use uuid::Uuid;

/// Delivery lifecycle of one queued notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Never attempted
    Pending,

    /// Failed `n` times, still eligible for retry
    Retrying(u32),

    /// Accepted by the transport; terminal
    Delivered,

    /// Retry budget spent; terminal, surfaced as a dismissible warning
    Exhausted,
}

impl DeliveryState {
    /// Whether the record is still eligible for a delivery attempt
    pub fn is_ready(&self) -> bool {
        matches!(self, DeliveryState::Pending | DeliveryState::Retrying(_))
    }
}

/// One notification awaiting delivery
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedNotification {
    /// Locally assigned record id
    pub id: Uuid,

    /// Destination (phone number or channel identifier)
    pub recipient: String,

    /// Message body
    pub message: String,

    /// Current lifecycle state
    pub state: DeliveryState,

    /// Number of delivery attempts made so far
    pub attempts: u32,
}

/// Default attempt budget per notification
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// In-memory bounded-retry queue of operator notifications
#[derive(Debug, Default)]
pub struct NotificationQueue {
    entries: Vec<QueuedNotification>,
    max_attempts: u32,
}

impl NotificationQueue {
    /// Create a queue with the default attempt budget (3)
    pub fn new() -> Self {
        Self::with_max_attempts(DEFAULT_MAX_ATTEMPTS)
    }

    /// Create a queue with a custom attempt budget (>= 1)
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        NotificationQueue {
            entries: Vec::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Add a notification to the queue
    ///
    /// # Returns
    ///
    /// The locally assigned record id.
    pub fn enqueue(&mut self, recipient: &str, message: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push(QueuedNotification {
            id,
            recipient: recipient.to_string(),
            message: message.to_string(),
            state: DeliveryState::Pending,
            attempts: 0,
        });
        id
    }

    /// Look up a record by id
    pub fn entry(&self, id: Uuid) -> Option<&QueuedNotification> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// All records, in enqueue order
    pub fn entries(&self) -> &[QueuedNotification] {
        &self.entries
    }

    /// Number of records still eligible for delivery
    pub fn ready_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.state.is_ready())
            .count()
    }

    /// Records whose retry budget is spent
    pub fn exhausted(&self) -> impl Iterator<Item = &QueuedNotification> {
        self.entries
            .iter()
            .filter(|entry| entry.state == DeliveryState::Exhausted)
    }

    /// Record a failed delivery attempt
    ///
    /// Moves the record to `Retrying(n)` or, once the attempt budget is
    /// spent, to `Exhausted`.
    ///
    /// # Returns
    ///
    /// The record's new state, or `None` for an unknown id.
    pub fn record_failure(&mut self, id: Uuid) -> Option<DeliveryState> {
        let max_attempts = self.max_attempts;
        let entry = self.entries.iter_mut().find(|entry| entry.id == id)?;

        entry.attempts += 1;
        entry.state = if entry.attempts >= max_attempts {
            DeliveryState::Exhausted
        } else {
            DeliveryState::Retrying(entry.attempts)
        };
        Some(entry.state)
    }

    /// Record a successful delivery
    ///
    /// # Returns
    ///
    /// The record's new state, or `None` for an unknown id.
    pub fn record_delivery(&mut self, id: Uuid) -> Option<DeliveryState> {
        let entry = self.entries.iter_mut().find(|entry| entry.id == id)?;
        entry.attempts += 1;
        entry.state = DeliveryState::Delivered;
        Some(entry.state)
    }

    /// Drop delivered records, keeping failures visible
    pub fn purge_delivered(&mut self) {
        self.entries
            .retain(|entry| entry.state != DeliveryState::Delivered);
    }

    /// Attempt every ready record once through the transport
    ///
    /// One pass, one attempt per record: callers drive repeated passes on
    /// whatever cadence suits them (each pass costs each remaining record
    /// one unit of its attempt budget). Failures never propagate; they
    /// only advance the record's state.
    pub async fn dispatch_once<T: NotificationTransport>(&mut self, transport: &T) {
        let ready: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|entry| entry.state.is_ready())
            .map(|entry| entry.id)
            .collect();

        for id in ready {
            let Some(entry) = self.entries.iter().find(|entry| entry.id == id) else {
                continue;
            };
            let (recipient, message) = (entry.recipient.clone(), entry.message.clone());

            match transport.deliver(&recipient, &message).await {
                Ok(()) => {
                    self.record_delivery(id);
                }
                Err(error) => {
                    let state = self.record_failure(id);
                    warn!(%recipient, ?state, %error, "notification delivery failed");
                }
            }
        }
    }
}
