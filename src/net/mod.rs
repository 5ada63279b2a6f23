//! Network boundary module
//!
//! The REST and WebSocket edges of the engine.
//!
//! # Components
//!
//! - `config` - Single base-URL endpoint resolution
//! - `rest` - REST collaborator client (ledger, notifications, snapshots)
//! - `socket` - Reconnecting realtime event transport

pub mod config;
pub mod rest;
pub mod socket;

pub use config::Endpoints;
pub use rest::{RestClient, ServiceStatus, AUTH_EXEMPT_PATHS};
pub use socket::{EventSocket, TransportUpdate};
