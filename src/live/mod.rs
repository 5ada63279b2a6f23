//! Live register session service
//!
//! Single-task, event-driven service owning the reconciler and the
//! authenticated-session flag. It consumes transport updates, forwards
//! operator notices, and executes reconciler directives:
//!
//! - on every (re)connect: fetch a full drawer snapshot and replace the
//!   cache (the transport guarantees nothing across reconnects);
//! - on a resync directive: same fetch;
//! - on a logout directive: arm a grace timer long enough for the
//!   operator to read the reason, then clear all authentication state;
//! - on session expiry from any collaborator call: immediate teardown.
//!
//! A dropped connection is transient; the transport reconnects on its
//! own and the next `Connected` update triggers the resync here.

use crate::core::reconciler::{Directive, EventReconciler, Notice};
use crate::core::traits::SnapshotSource;
use crate::net::socket::TransportUpdate;
use crate::types::RegisterError;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Grace period between a force-logout event and session termination
pub const DEFAULT_LOGOUT_GRACE: Duration = Duration::from_secs(5);

// Parked value for the unarmed logout timer.
const TIMER_PARKED: Duration = Duration::from_secs(86_400);

/// The live session around one authenticated register
pub struct RegisterSession<S: SnapshotSource> {
    reconciler: EventReconciler,
    snapshots: S,
    notices: mpsc::Sender<Notice>,
    logout_grace: Duration,
    authenticated: bool,
}

impl<S: SnapshotSource> RegisterSession<S> {
    /// Create a session for an authenticated local user
    ///
    /// # Arguments
    ///
    /// * `local_user` - Identity used for self-origin suppression
    /// * `snapshots` - Resynchronization collaborator
    /// * `notices` - Channel the UI consumes operator notices from
    pub fn new(local_user: impl Into<String>, snapshots: S, notices: mpsc::Sender<Notice>) -> Self {
        Self::with_logout_grace(local_user, snapshots, notices, DEFAULT_LOGOUT_GRACE)
    }

    /// Create a session with a custom logout grace period
    pub fn with_logout_grace(
        local_user: impl Into<String>,
        snapshots: S,
        notices: mpsc::Sender<Notice>,
        logout_grace: Duration,
    ) -> Self {
        RegisterSession {
            reconciler: EventReconciler::new(local_user),
            snapshots,
            notices,
            logout_grace,
            authenticated: true,
        }
    }

    /// Whether the local session still holds authentication state
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Read access to the reconciler and its cached drawer state
    pub fn reconciler(&self) -> &EventReconciler {
        &self.reconciler
    }

    /// Process transport updates until the transport side hangs up
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The update stream ended, or a forced logout completed
    /// * `Err(RegisterError::AuthExpired)` - The session expired; all
    ///   authentication state is already cleared and the caller must
    ///   prompt for re-authentication
    pub async fn run(
        &mut self,
        mut updates: mpsc::Receiver<TransportUpdate>,
    ) -> Result<(), RegisterError> {
        let logout_timer = sleep(TIMER_PARKED);
        tokio::pin!(logout_timer);
        let mut logout_reason: Option<String> = None;

        loop {
            tokio::select! {
                () = &mut logout_timer, if logout_reason.is_some() => {
                    let reason = logout_reason.take().unwrap_or_default();
                    self.terminate(&reason);
                    return Ok(());
                }
                update = updates.recv() => match update {
                    None => {
                        // The transport hung up; honor a pending logout
                        // before leaving.
                        if logout_reason.is_some() {
                            logout_timer.as_mut().await;
                            let reason = logout_reason.take().unwrap_or_default();
                            self.terminate(&reason);
                        }
                        return Ok(());
                    }
                    Some(TransportUpdate::Connected) => {
                        self.resync().await?;
                    }
                    Some(TransportUpdate::Dropped { reason }) => {
                        warn!(%reason, "realtime connection dropped, awaiting reconnect");
                    }
                    Some(TransportUpdate::Event(envelope)) => {
                        let outcome = match self.reconciler.apply(&envelope) {
                            Ok(outcome) => outcome,
                            Err(error) => {
                                warn!(%error, event = envelope.event.name(), "event application failed");
                                continue;
                            }
                        };

                        if let Some(notice) = outcome.notice {
                            self.forward_notice(notice);
                        }

                        for directive in outcome.directives {
                            match directive {
                                Directive::Resync => self.resync().await?,
                                Directive::ScheduleLogout { reason } => {
                                    info!(%reason, grace = ?self.logout_grace, "logout scheduled");
                                    logout_reason = Some(reason);
                                    logout_timer
                                        .as_mut()
                                        .reset(Instant::now() + self.logout_grace);
                                }
                            }
                        }
                    }
                },
            }
        }
    }

    /// Fetch a full snapshot and replace the cached drawer state
    ///
    /// Transient fetch failures are logged and absorbed; the cache keeps
    /// its previous contents until the next resync opportunity. Session
    /// expiry tears the session down immediately.
    async fn resync(&mut self) -> Result<(), RegisterError> {
        match self.snapshots.fetch_drawer_snapshot().await {
            Ok(snapshot) => {
                self.reconciler.resync(&snapshot);
                Ok(())
            }
            Err(error @ RegisterError::AuthExpired { .. }) => {
                self.terminate("session expired");
                Err(error)
            }
            Err(error) => {
                warn!(%error, "resynchronization fetch failed");
                Ok(())
            }
        }
    }

    fn forward_notice(&self, notice: Notice) {
        if let Err(error) = self.notices.try_send(notice) {
            debug!(%error, "notice dropped, no consumer keeping up");
        }
    }

    fn terminate(&mut self, reason: &str) {
        self.authenticated = false;
        info!(%reason, "local session terminated, authentication state cleared");
    }
}
