//! Real-time event types
//!
//! This module defines the closed set of events the backend pushes over
//! the realtime channel, the raw wire form they arrive in, and the
//! boundary parsing that turns untyped wire payloads into typed records.
//!
//! Event names form a closed tagged union: adding an event type is a
//! compile-time-visible change, and every consumer dispatches with an
//! exhaustive match. Unknown names parse to a forward-compatible no-op.

use crate::types::{DrawerId, DrawerSnapshot, RegisterError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

/// Raw realtime message as received from the wire
///
/// Only the envelope fields are typed here; the payload stays a JSON
/// value until the event name selects the payload schema to parse it
/// against.
#[derive(Debug, Clone, Deserialize)]
pub struct WireEvent {
    /// Wire name of the event
    pub event: String,

    /// Identity of the user whose action produced the event
    ///
    /// Absent for system-originated events.
    #[serde(default)]
    pub origin_user: Option<String>,

    /// Server-assigned event id, used for de-duplication when present
    #[serde(default)]
    pub event_id: Option<String>,

    /// Server-side send timestamp, used for last-write-wins ordering
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,

    /// Event-specific payload, parsed per event name
    #[serde(default)]
    pub payload: Value,

    /// Optional full drawer snapshot overriding delta application
    #[serde(default)]
    pub snapshot: Option<DrawerSnapshot>,
}

/// A realtime event, parsed and typed at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegisterEvent {
    /// A drawer was opened
    DrawerOpened {
        /// The drawer that opened
        drawer: DrawerId,
    },

    /// The open drawer was closed
    DrawerClosed {
        /// The drawer that closed
        drawer: DrawerId,
    },

    /// A manual drawer transaction was recorded
    TransactionAdded {
        /// Signed transaction amount (income positive, expense negative)
        amount: Decimal,
    },

    /// A manual drawer transaction was removed
    TransactionRemoved {
        /// Signed amount of the removed transaction
        amount: Decimal,
    },

    /// A sale completed at another terminal
    SaleProcessed {
        /// Sale total
        amount: Decimal,
    },

    /// Stock was reserved against an open ticket
    StockReserved {
        /// Units reserved
        quantity: i64,
    },

    /// Reserved stock was released
    StockReleased {
        /// Units released
        quantity: i64,
    },

    /// The user roster changed; cached user data is stale
    UsersUpdated,

    /// Administrative override: terminate the local session
    ///
    /// Never suppressed, regardless of origin.
    ForceLogout {
        /// Reason shown to the operator during the grace period
        reason: String,
    },

    /// Block operations for all users
    LockUsers {
        /// Reason shown while operations are blocked
        reason: String,
    },

    /// Unblock operations
    UnlockUsers,

    /// The local-to-foreign exchange rate changed
    RateUpdated {
        /// New exchange rate
        rate: Decimal,
    },

    /// A drawer left pending was closed automatically
    PendingDrawerAutoClosed {
        /// The drawer that was auto-closed
        drawer: DrawerId,
    },

    /// A drawer left pending was resolved by an administrator
    PendingDrawerResolved {
        /// The drawer that was resolved
        drawer: DrawerId,
    },

    /// A system-wide lock was lifted
    SystemUnlocked,
}

impl RegisterEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            RegisterEvent::DrawerOpened { .. } => "drawer-opened",
            RegisterEvent::DrawerClosed { .. } => "drawer-closed",
            RegisterEvent::TransactionAdded { .. } => "transaction-added",
            RegisterEvent::TransactionRemoved { .. } => "transaction-removed",
            RegisterEvent::SaleProcessed { .. } => "sale-processed",
            RegisterEvent::StockReserved { .. } => "stock-reserved",
            RegisterEvent::StockReleased { .. } => "stock-released",
            RegisterEvent::UsersUpdated => "users-updated",
            RegisterEvent::ForceLogout { .. } => "force-logout",
            RegisterEvent::LockUsers { .. } => "lock-users",
            RegisterEvent::UnlockUsers => "unlock-users",
            RegisterEvent::RateUpdated { .. } => "rate-updated",
            RegisterEvent::PendingDrawerAutoClosed { .. } => "pending-drawer-auto-closed",
            RegisterEvent::PendingDrawerResolved { .. } => "pending-drawer-resolved",
            RegisterEvent::SystemUnlocked => "system-unlocked",
        }
    }

    /// Whether the event updates a cached aggregate by delta
    ///
    /// Delta events must never be applied twice for the same wire event;
    /// the reconciler de-duplicates them.
    pub fn carries_delta(&self) -> bool {
        matches!(
            self,
            RegisterEvent::TransactionAdded { .. }
                | RegisterEvent::TransactionRemoved { .. }
                | RegisterEvent::SaleProcessed { .. }
                | RegisterEvent::StockReserved { .. }
                | RegisterEvent::StockReleased { .. }
        )
    }

    /// Build the outbound wire form of this event
    ///
    /// The same channel that delivers events publishes the local user's
    /// own actions so other connected registers converge.
    pub fn to_wire(&self, origin_user: &str) -> Value {
        let payload = match self {
            RegisterEvent::DrawerOpened { drawer }
            | RegisterEvent::DrawerClosed { drawer }
            | RegisterEvent::PendingDrawerAutoClosed { drawer }
            | RegisterEvent::PendingDrawerResolved { drawer } => json!({ "drawer": drawer }),
            RegisterEvent::TransactionAdded { amount }
            | RegisterEvent::TransactionRemoved { amount }
            | RegisterEvent::SaleProcessed { amount } => json!({ "amount": amount }),
            RegisterEvent::StockReserved { quantity }
            | RegisterEvent::StockReleased { quantity } => json!({ "quantity": quantity }),
            RegisterEvent::ForceLogout { reason } | RegisterEvent::LockUsers { reason } => {
                json!({ "reason": reason })
            }
            RegisterEvent::RateUpdated { rate } => json!({ "rate": rate }),
            RegisterEvent::UsersUpdated
            | RegisterEvent::UnlockUsers
            | RegisterEvent::SystemUnlocked => json!({}),
        };

        json!({
            "event": self.name(),
            "origin_user": origin_user,
            "payload": payload,
        })
    }
}

/// A parsed event together with its envelope metadata
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    /// The typed event
    pub event: RegisterEvent,

    /// Identity of the originating user, absent for system events
    pub origin_user: Option<String>,

    /// Server-assigned event id, if the backend provided one
    pub event_id: Option<String>,

    /// Server-side send timestamp, if provided
    pub sent_at: Option<DateTime<Utc>>,

    /// Full drawer snapshot overriding delta application, if provided
    pub snapshot: Option<DrawerSnapshot>,
}

impl EventEnvelope {
    /// Envelope with no metadata, useful for locally synthesized events
    pub fn bare(event: RegisterEvent) -> Self {
        EventEnvelope {
            event,
            origin_user: None,
            event_id: None,
            sent_at: None,
            snapshot: None,
        }
    }

    /// Whether this event originated from the given user
    pub fn is_from(&self, user: &str) -> bool {
        self.origin_user.as_deref() == Some(user)
    }

    /// Parse a raw wire message into a typed envelope
    ///
    /// # Returns
    ///
    /// * `Ok(Some(envelope))` - A known event with a valid payload
    /// * `Ok(None)` - An unknown event name (forward-compatible no-op)
    /// * `Err(RegisterError::InvalidEvent)` - A known event whose payload
    ///   failed boundary validation
    pub fn from_wire(wire: WireEvent) -> Result<Option<Self>, RegisterError> {
        let event = match parse_event(&wire.event, wire.payload)? {
            Some(event) => event,
            None => return Ok(None),
        };

        Ok(Some(EventEnvelope {
            event,
            origin_user: wire.origin_user,
            event_id: wire.event_id,
            sent_at: wire.sent_at,
            snapshot: wire.snapshot,
        }))
    }
}

/// Parse a raw JSON message into a typed envelope
///
/// Convenience wrapper over [`EventEnvelope::from_wire`] for transport
/// code that holds the message as text.
pub fn parse_wire_event(raw: &str) -> Result<Option<EventEnvelope>, RegisterError> {
    let wire: WireEvent = serde_json::from_str(raw)?;
    EventEnvelope::from_wire(wire)
}

#[derive(Debug, Deserialize)]
struct DrawerPayload {
    drawer: DrawerId,
}

#[derive(Debug, Deserialize)]
struct AmountPayload {
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct QuantityPayload {
    quantity: i64,
}

#[derive(Debug, Deserialize)]
struct ReasonPayload {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RatePayload {
    rate: Decimal,
}

/// Fallback reason shown when an administrative event omits one
const DEFAULT_ADMIN_REASON: &str = "administrative action";

fn parse_event(name: &str, payload: Value) -> Result<Option<RegisterEvent>, RegisterError> {
    fn typed<T: serde::de::DeserializeOwned>(
        name: &str,
        payload: Value,
    ) -> Result<T, RegisterError> {
        serde_json::from_value(payload).map_err(|e| RegisterError::invalid_event(name, e.to_string()))
    }

    // An absent payload parses like an empty one; events with required
    // fields still fail on the missing field.
    let payload = if payload.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        payload
    };

    let event = match name {
        "drawer-opened" => {
            let p: DrawerPayload = typed(name, payload)?;
            RegisterEvent::DrawerOpened { drawer: p.drawer }
        }
        "drawer-closed" => {
            let p: DrawerPayload = typed(name, payload)?;
            RegisterEvent::DrawerClosed { drawer: p.drawer }
        }
        "transaction-added" => {
            let p: AmountPayload = typed(name, payload)?;
            RegisterEvent::TransactionAdded { amount: p.amount }
        }
        "transaction-removed" => {
            let p: AmountPayload = typed(name, payload)?;
            RegisterEvent::TransactionRemoved { amount: p.amount }
        }
        "sale-processed" => {
            let p: AmountPayload = typed(name, payload)?;
            RegisterEvent::SaleProcessed { amount: p.amount }
        }
        "stock-reserved" => {
            let p: QuantityPayload = typed(name, payload)?;
            RegisterEvent::StockReserved {
                quantity: p.quantity,
            }
        }
        "stock-released" => {
            let p: QuantityPayload = typed(name, payload)?;
            RegisterEvent::StockReleased {
                quantity: p.quantity,
            }
        }
        "users-updated" => RegisterEvent::UsersUpdated,
        "force-logout" => {
            let p: ReasonPayload = typed(name, payload)?;
            RegisterEvent::ForceLogout {
                reason: p.reason.unwrap_or_else(|| DEFAULT_ADMIN_REASON.to_string()),
            }
        }
        "lock-users" => {
            let p: ReasonPayload = typed(name, payload)?;
            RegisterEvent::LockUsers {
                reason: p.reason.unwrap_or_else(|| DEFAULT_ADMIN_REASON.to_string()),
            }
        }
        "unlock-users" => RegisterEvent::UnlockUsers,
        "rate-updated" => {
            let p: RatePayload = typed(name, payload)?;
            RegisterEvent::RateUpdated { rate: p.rate }
        }
        "pending-drawer-auto-closed" => {
            let p: DrawerPayload = typed(name, payload)?;
            RegisterEvent::PendingDrawerAutoClosed { drawer: p.drawer }
        }
        "pending-drawer-resolved" => {
            let p: DrawerPayload = typed(name, payload)?;
            RegisterEvent::PendingDrawerResolved { drawer: p.drawer }
        }
        "system-unlocked" => RegisterEvent::SystemUnlocked,
        _ => return Ok(None),
    };

    Ok(Some(event))
}
