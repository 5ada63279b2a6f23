//! Real-time state reconciler
//!
//! This module consumes the stream of typed realtime events and decides,
//! per event, the local cache mutation, the operator-facing notice, and
//! any directives for the surrounding session service (resynchronize,
//! schedule logout).
//!
//! # Contract
//!
//! - An event originating from the local user never re-applies its delta
//!   (the optimistic local update already happened) and never produces a
//!   "someone else did X" notice, but still directs a cache-refresh
//!   resynchronization because the optimistic update may be incomplete.
//! - Foreign and system events apply their mutation and surface a notice.
//! - `force-logout` is unconditional and never suppressed.
//! - Flag events (lock/unlock, rate) are idempotent and last-write-wins
//!   by timestamp, so out-of-order delivery converges.
//! - Delta events are de-duplicated by event id when the backend assigns
//!   one, else by a short time-window content fingerprint, so the
//!   transport's at-least-once delivery never double-applies a delta.

use crate::core::cache::DrawerCache;
use crate::types::{DrawerSnapshot, EventEnvelope, RegisterError, RegisterEvent};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

/// Severity of an operator-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Routine activity on another terminal
    Info,

    /// Something that needs the operator's attention
    Warning,
}

/// A short, dismissible operator-facing message
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    /// Severity of the notice
    pub kind: NoticeKind,

    /// Human-readable text
    pub text: String,
}

impl Notice {
    fn info(text: String) -> Self {
        Notice {
            kind: NoticeKind::Info,
            text,
        }
    }

    fn warning(text: String) -> Self {
        Notice {
            kind: NoticeKind::Warning,
            text,
        }
    }
}

/// An instruction for the surrounding session service
///
/// The reconciler itself stays synchronous; anything that needs the
/// network or a timer is returned as a directive for the service to
/// execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Fetch a full drawer snapshot and replace the cache
    Resync,

    /// Terminate the local session after the grace period
    ScheduleLogout {
        /// Reason shown to the operator while the grace period runs
        reason: String,
    },
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Whether the cache was mutated
    pub applied: bool,

    /// Operator-facing notice, if one should be shown
    pub notice: Option<Notice>,

    /// Instructions for the session service
    pub directives: Vec<Directive>,
}

impl Outcome {
    fn noop() -> Self {
        Outcome {
            applied: false,
            notice: None,
            directives: Vec::new(),
        }
    }

    fn refresh() -> Self {
        Outcome {
            applied: false,
            notice: None,
            directives: vec![Directive::Resync],
        }
    }
}

/// Bounded memory of recently applied delta events
///
/// Events carrying a server-assigned id are remembered by id; events
/// without one are remembered by a content fingerprint that expires after
/// a short window.
#[derive(Debug)]
struct RecentEvents {
    ids: HashSet<String>,
    id_order: VecDeque<String>,
    fingerprints: VecDeque<(u64, Instant)>,
    window: Duration,
    capacity: usize,
}

impl RecentEvents {
    fn new(window: Duration, capacity: usize) -> Self {
        RecentEvents {
            ids: HashSet::new(),
            id_order: VecDeque::new(),
            fingerprints: VecDeque::new(),
            window,
            capacity,
        }
    }

    /// Record the event; returns `false` if it was already seen
    fn observe(&mut self, envelope: &EventEnvelope) -> bool {
        if let Some(id) = &envelope.event_id {
            if self.ids.contains(id) {
                return false;
            }
            self.ids.insert(id.clone());
            self.id_order.push_back(id.clone());
            if self.id_order.len() > self.capacity {
                if let Some(evicted) = self.id_order.pop_front() {
                    self.ids.remove(&evicted);
                }
            }
            return true;
        }

        let now = Instant::now();
        let fingerprint = fingerprint(envelope);

        while let Some((_, seen_at)) = self.fingerprints.front() {
            if now.duration_since(*seen_at) >= self.window {
                self.fingerprints.pop_front();
            } else {
                break;
            }
        }

        if self.fingerprints.iter().any(|(f, _)| *f == fingerprint) {
            return false;
        }

        self.fingerprints.push_back((fingerprint, now));
        if self.fingerprints.len() > self.capacity {
            self.fingerprints.pop_front();
        }
        true
    }
}

fn fingerprint(envelope: &EventEnvelope) -> u64 {
    let mut hasher = DefaultHasher::new();
    envelope.event.hash(&mut hasher);
    envelope.origin_user.hash(&mut hasher);
    hasher.finish()
}

/// Default expiry for content-fingerprint de-duplication
const DEDUP_WINDOW: Duration = Duration::from_secs(2);

/// Bound on remembered event ids and fingerprints
const DEDUP_CAPACITY: usize = 256;

/// Applies realtime events to the local drawer cache
pub struct EventReconciler {
    local_user: String,
    cache: DrawerCache,
    recent: RecentEvents,
}

impl EventReconciler {
    /// Create a reconciler for the given local user identity
    pub fn new(local_user: impl Into<String>) -> Self {
        Self::with_dedup_window(local_user, DEDUP_WINDOW)
    }

    /// Create a reconciler with a custom de-duplication window
    pub fn with_dedup_window(local_user: impl Into<String>, window: Duration) -> Self {
        EventReconciler {
            local_user: local_user.into(),
            cache: DrawerCache::new(),
            recent: RecentEvents::new(window, DEDUP_CAPACITY),
        }
    }

    /// The local user identity events are compared against
    pub fn local_user(&self) -> &str {
        &self.local_user
    }

    /// Read access to the cached drawer state
    pub fn cache(&self) -> &DrawerCache {
        &self.cache
    }

    /// Replace the cache from a resynchronization snapshot
    pub fn resync(&mut self, snapshot: &DrawerSnapshot) {
        self.cache.replace(snapshot);
    }

    /// Apply one event and report what happened
    ///
    /// # Errors
    ///
    /// Returns an error only when a delta would overflow a cached
    /// aggregate; the cache is left unchanged in that case.
    pub fn apply(&mut self, envelope: &EventEnvelope) -> Result<Outcome, RegisterError> {
        // Administrative override: unconditional, never suppressed, even
        // when it nominally originated from this user.
        if let RegisterEvent::ForceLogout { reason } = &envelope.event {
            return Ok(Outcome {
                applied: false,
                notice: Some(Notice::warning(format!(
                    "your session will close shortly: {reason}"
                ))),
                directives: vec![Directive::ScheduleLogout {
                    reason: reason.clone(),
                }],
            });
        }

        // A delta delivered twice must not be applied twice.
        if envelope.event.carries_delta() && !self.recent.observe(envelope) {
            return Ok(Outcome::noop());
        }

        let from_self = envelope.is_from(&self.local_user);
        let actor = envelope.origin_user.as_deref().unwrap_or("another terminal");
        let stamp = envelope.sent_at;

        // Flag events are idempotent and apply regardless of origin; only
        // the notice is suppressed for the user's own actions.
        match &envelope.event {
            RegisterEvent::LockUsers { reason } => {
                let changed = self.cache.apply_lock(reason, stamp);
                return Ok(Outcome {
                    applied: changed,
                    notice: (changed && !from_self).then(|| {
                        Notice::warning(format!("operations blocked by {actor}: {reason}"))
                    }),
                    directives: Vec::new(),
                });
            }
            RegisterEvent::UnlockUsers => {
                let changed = self.cache.apply_unlock(stamp);
                return Ok(Outcome {
                    applied: changed,
                    notice: (changed && !from_self)
                        .then(|| Notice::info("operations are no longer blocked".to_string())),
                    directives: Vec::new(),
                });
            }
            RegisterEvent::SystemUnlocked => {
                let changed = self.cache.apply_unlock(stamp);
                return Ok(Outcome {
                    applied: changed,
                    notice: changed
                        .then(|| Notice::info("the system lock was lifted".to_string())),
                    directives: Vec::new(),
                });
            }
            RegisterEvent::RateUpdated { rate } => {
                let changed = self.cache.set_exchange_rate(*rate, stamp);
                return Ok(Outcome {
                    applied: changed,
                    notice: (changed && !from_self)
                        .then(|| Notice::info(format!("exchange rate updated to {rate}"))),
                    directives: Vec::new(),
                });
            }
            _ => {}
        }

        // The local user's own action already updated the cache
        // optimistically; re-applying the mutation would double it. A
        // refresh fetch still runs because the optimistic update may lack
        // server-assigned data.
        if from_self {
            return Ok(Outcome::refresh());
        }

        // An explicit snapshot replaces the cache wholesale instead of a
        // delta.
        if let Some(snapshot) = &envelope.snapshot {
            self.cache.replace(snapshot);
            return Ok(Outcome {
                applied: true,
                notice: foreign_notice(&envelope.event, actor),
                directives: Vec::new(),
            });
        }

        let mut directives = Vec::new();
        match &envelope.event {
            RegisterEvent::DrawerOpened { drawer } => self.cache.open_drawer(*drawer),
            RegisterEvent::DrawerClosed { .. } => self.cache.close_drawer(),
            RegisterEvent::TransactionAdded { amount } => self.cache.add_transaction(*amount)?,
            RegisterEvent::TransactionRemoved { amount } => {
                self.cache.remove_transaction(*amount)?
            }
            RegisterEvent::SaleProcessed { amount } => self.cache.record_sale(*amount)?,
            RegisterEvent::StockReserved { quantity } => {
                self.cache.adjust_reserved_stock(*quantity)?
            }
            RegisterEvent::StockReleased { quantity } => {
                self.cache.adjust_reserved_stock(-quantity)?
            }
            RegisterEvent::UsersUpdated => directives.push(Directive::Resync),
            RegisterEvent::PendingDrawerAutoClosed { drawer } => {
                if self.cache.drawer() == Some(*drawer) {
                    self.cache.close_drawer();
                }
                directives.push(Directive::Resync);
            }
            RegisterEvent::PendingDrawerResolved { .. } => directives.push(Directive::Resync),
            // Handled above
            RegisterEvent::ForceLogout { .. }
            | RegisterEvent::LockUsers { .. }
            | RegisterEvent::UnlockUsers
            | RegisterEvent::SystemUnlocked
            | RegisterEvent::RateUpdated { .. } => unreachable!("handled before dispatch"),
        }

        Ok(Outcome {
            applied: true,
            notice: foreign_notice(&envelope.event, actor),
            directives,
        })
    }
}

/// Notice text for an event that originated elsewhere
fn foreign_notice(event: &RegisterEvent, actor: &str) -> Option<Notice> {
    let notice = match event {
        RegisterEvent::DrawerOpened { drawer } => {
            Notice::info(format!("{actor} opened drawer {drawer}"))
        }
        RegisterEvent::DrawerClosed { drawer } => {
            Notice::info(format!("{actor} closed drawer {drawer}"))
        }
        RegisterEvent::TransactionAdded { amount } => {
            Notice::info(format!("{actor} added a drawer transaction of {amount}"))
        }
        RegisterEvent::TransactionRemoved { amount } => {
            Notice::info(format!("{actor} removed a drawer transaction of {amount}"))
        }
        RegisterEvent::SaleProcessed { amount } => {
            Notice::info(format!("{actor} processed a sale of {amount}"))
        }
        RegisterEvent::StockReserved { quantity } => {
            Notice::info(format!("{actor} reserved {quantity} stock units"))
        }
        RegisterEvent::StockReleased { quantity } => {
            Notice::info(format!("{actor} released {quantity} stock units"))
        }
        RegisterEvent::UsersUpdated => Notice::info(format!("{actor} updated the user accounts")),
        RegisterEvent::PendingDrawerAutoClosed { drawer } => {
            Notice::warning(format!("drawer {drawer} was closed automatically"))
        }
        RegisterEvent::PendingDrawerResolved { drawer } => {
            Notice::info(format!("pending drawer {drawer} was resolved"))
        }
        _ => return None,
    };
    Some(notice)
}
