//! Error types for the cash-register engine
//!
//! This module defines all error types that can occur while reconciling a
//! drawer, applying real-time events, or talking to the backend.
//!
//! # Error Categories
//!
//! - **Validation errors**: missing or invalid operator input; surfaced
//!   immediately, block submission, never retried.
//! - **Workflow errors**: operations attempted in the wrong session phase
//!   (cancelling a discrepant session, authorizing a balanced one).
//! - **Ledger errors**: the adjustment batch was rejected; fatal to the
//!   session, retried as a whole batch, escalated when retries exhaust.
//! - **Transport errors**: connection drops and HTTP failures; transient,
//!   absorbed by reconnect/resync or the notification retry queue.
//! - **Auth errors**: an authenticated call answered 401 outside the
//!   allow-list; triggers global session teardown.

use crate::types::Instrument;
use thiserror::Error;

/// Main error type for the cash-register engine
///
/// Each variant carries enough context to surface a short, dismissible,
/// human-readable message to the operator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegisterError {
    /// A counted amount was not entered for an instrument
    ///
    /// Blocks reconciliation submission; all three instrument counts are
    /// mandatory and absence never defaults to zero.
    #[error("count for {instrument} is missing: all three instrument counts are mandatory")]
    MissingCount {
        /// The instrument whose count is absent
        instrument: Instrument,
    },

    /// Operator input failed validation
    #[error("invalid input: {message}")]
    Validation {
        /// Description of what was invalid
        message: String,
    },

    /// An operation was attempted in the wrong session phase
    #[error("cannot {operation} while the session is {phase}")]
    PhaseViolation {
        /// The operation that was attempted
        operation: String,
        /// The phase the session was in
        phase: String,
    },

    /// Cancellation was attempted after a discrepancy was observed
    ///
    /// Once a session is awaiting authorization it must either complete or
    /// be explicitly escalated; cancelling would hide the discrepancy.
    #[error("a discrepant session cannot be cancelled (session is {phase})")]
    CancellationBlocked {
        /// The phase the session was in
        phase: String,
    },

    /// A discrepant count sheet has no authorizer attached
    #[error("drawer {drawer} is discrepant and requires an authorizer")]
    AuthorizationRequired {
        /// The drawer whose sheet is discrepant
        drawer: u32,
    },

    /// The ledger collaborator rejected the adjustment batch
    ///
    /// The batch is all-or-nothing: no adjustment is considered posted
    /// until the collaborator confirms all of them. This error escalates
    /// after bounded whole-batch retries.
    #[error("ledger rejected the adjustment batch after {attempts} attempts: {message}")]
    LedgerRejected {
        /// Number of whole-batch attempts made
        attempts: u32,
        /// Description of the last rejection
        message: String,
    },

    /// A side-channel notification could not be delivered
    ///
    /// Non-fatal: the enclosing workflow proceeds and the record stays in
    /// the bounded retry queue.
    #[error("notification to {recipient} failed: {message}")]
    NotificationDelivery {
        /// Intended recipient
        recipient: String,
        /// Description of the delivery failure
        message: String,
    },

    /// Transport-level failure (socket drop, request error)
    ///
    /// Transient: triggers reconnect and, on reconnect, a full
    /// resynchronization fetch.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the transport failure
        message: String,
    },

    /// An HTTP call returned a non-success status
    #[error("request to {endpoint} failed with status {status}")]
    Http {
        /// The endpoint path that failed
        endpoint: String,
        /// The HTTP status code received
        status: u16,
    },

    /// An authenticated call was answered 401 outside the allow-list
    ///
    /// The local session is no longer valid; all authentication state is
    /// torn down and the operator must re-authenticate.
    #[error("session expired while calling {endpoint}")]
    AuthExpired {
        /// The endpoint path that reported expiry
        endpoint: String,
    },

    /// A known event arrived with a payload that failed boundary parsing
    #[error("invalid payload for event '{name}': {message}")]
    InvalidEvent {
        /// The wire event name
        name: String,
        /// Description of the payload problem
        message: String,
    },

    /// Parse error (JSON or CSV)
    #[error("parse error: {message}")]
    Parse {
        /// Description of the parsing error
        message: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// Arithmetic overflow would occur updating a cached aggregate
    ///
    /// The mutation is rejected and the cache left unchanged.
    #[error("arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
    },
}

// Conversion from io::Error
impl From<std::io::Error> for RegisterError {
    fn from(error: std::io::Error) -> Self {
        RegisterError::Io {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error
impl From<csv::Error> for RegisterError {
    fn from(error: csv::Error) -> Self {
        RegisterError::Parse {
            message: error.to_string(),
        }
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for RegisterError {
    fn from(error: serde_json::Error) -> Self {
        RegisterError::Parse {
            message: error.to_string(),
        }
    }
}

// Conversion from reqwest::Error
impl From<reqwest::Error> for RegisterError {
    fn from(error: reqwest::Error) -> Self {
        RegisterError::Connection {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl RegisterError {
    /// Create a MissingCount error
    pub fn missing_count(instrument: Instrument) -> Self {
        RegisterError::MissingCount { instrument }
    }

    /// Create a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        RegisterError::Validation {
            message: message.into(),
        }
    }

    /// Create a PhaseViolation error
    pub fn phase_violation(operation: &str, phase: impl Into<String>) -> Self {
        RegisterError::PhaseViolation {
            operation: operation.to_string(),
            phase: phase.into(),
        }
    }

    /// Create a CancellationBlocked error
    pub fn cancellation_blocked(phase: impl Into<String>) -> Self {
        RegisterError::CancellationBlocked {
            phase: phase.into(),
        }
    }

    /// Create a LedgerRejected error
    pub fn ledger_rejected(attempts: u32, message: impl Into<String>) -> Self {
        RegisterError::LedgerRejected {
            attempts,
            message: message.into(),
        }
    }

    /// Create a NotificationDelivery error
    pub fn notification_delivery(recipient: &str, message: impl Into<String>) -> Self {
        RegisterError::NotificationDelivery {
            recipient: recipient.to_string(),
            message: message.into(),
        }
    }

    /// Create a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        RegisterError::Connection {
            message: message.into(),
        }
    }

    /// Create an Http error
    pub fn http(endpoint: &str, status: u16) -> Self {
        RegisterError::Http {
            endpoint: endpoint.to_string(),
            status,
        }
    }

    /// Create an AuthExpired error
    pub fn auth_expired(endpoint: &str) -> Self {
        RegisterError::AuthExpired {
            endpoint: endpoint.to_string(),
        }
    }

    /// Create an InvalidEvent error
    pub fn invalid_event(name: &str, message: impl Into<String>) -> Self {
        RegisterError::InvalidEvent {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str) -> Self {
        RegisterError::ArithmeticOverflow {
            operation: operation.to_string(),
        }
    }
}
