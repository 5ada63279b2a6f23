//! Realtime event transport
//!
//! Maintains the WebSocket connection to the backend, parsing inbound
//! messages into typed envelopes and publishing the local user's own
//! actions outbound on the same channel.
//!
//! The transport guarantees at-least-once delivery, possibly out of
//! order, and nothing across reconnects. Every (re)connect is therefore
//! surfaced as [`TransportUpdate::Connected`] so the session can run a
//! full resynchronization fetch instead of trusting stale cache. A
//! dropped connection is never terminal: the loop reconnects with capped
//! exponential backoff.

use crate::types::{parse_wire_event, EventEnvelope};
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// What the transport reports to the session service
#[derive(Debug, Clone, PartialEq)]
pub enum TransportUpdate {
    /// A connection was (re)established; the cache must be resynced
    Connected,

    /// A typed event arrived
    Event(EventEnvelope),

    /// The connection dropped; the transport will reconnect on its own
    Dropped {
        /// Why the connection ended
        reason: String,
    },
}

/// Default delay before the first reconnect attempt
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Ceiling for the reconnect delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Reconnecting WebSocket transport for realtime events
pub struct EventSocket {
    url: Url,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl EventSocket {
    /// Create a transport for the given WebSocket URL
    pub fn new(url: Url) -> Self {
        Self::with_backoff(url, INITIAL_BACKOFF, MAX_BACKOFF)
    }

    /// Create a transport with custom reconnect pacing
    pub fn with_backoff(url: Url, initial_backoff: Duration, max_backoff: Duration) -> Self {
        EventSocket {
            url,
            initial_backoff,
            max_backoff,
        }
    }

    /// Run the connection loop until the session side hangs up
    ///
    /// Inbound text frames are parsed at the boundary: unknown event
    /// names are ignored, malformed payloads are logged and dropped.
    /// Values received on `outbound` are published as text frames.
    /// The loop ends when `updates` has no receiver left.
    pub async fn run(self, updates: mpsc::Sender<TransportUpdate>, mut outbound: mpsc::Receiver<Value>) {
        let mut backoff = self.initial_backoff;
        let mut outbound_open = true;

        loop {
            match connect_async(self.url.as_str()).await {
                Ok((socket, _response)) => {
                    backoff = self.initial_backoff;
                    if updates.send(TransportUpdate::Connected).await.is_err() {
                        return;
                    }

                    let (mut sink, mut stream) = socket.split();
                    let reason = loop {
                        tokio::select! {
                            message = stream.next() => match message {
                                Some(Ok(Message::Text(raw))) => match parse_wire_event(&raw) {
                                    Ok(Some(envelope)) => {
                                        if updates
                                            .send(TransportUpdate::Event(envelope))
                                            .await
                                            .is_err()
                                        {
                                            return;
                                        }
                                    }
                                    Ok(None) => debug!("ignoring unknown event"),
                                    Err(error) => warn!(%error, "dropping malformed event"),
                                },
                                Some(Ok(Message::Close(_))) => {
                                    break "server closed the connection".to_string();
                                }
                                Some(Ok(_)) => {}
                                Some(Err(error)) => break error.to_string(),
                                None => break "stream ended".to_string(),
                            },
                            published = outbound.recv(), if outbound_open => match published {
                                Some(value) => {
                                    if let Err(error) =
                                        sink.send(Message::Text(value.to_string())).await
                                    {
                                        break error.to_string();
                                    }
                                }
                                None => outbound_open = false,
                            },
                        }
                    };

                    if updates
                        .send(TransportUpdate::Dropped { reason })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Err(error) => {
                    if updates
                        .send(TransportUpdate::Dropped {
                            reason: error.to_string(),
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }

            tokio::time::sleep(backoff).await;
            backoff = next_backoff(backoff, self.max_backoff);
        }
    }
}

/// Double the delay up to the ceiling
fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}
