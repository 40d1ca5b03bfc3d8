//! Error types for the binding layer.
//!
//! Engine failures never show up here; they come back as `false` or
//! `null` with the reason in the handle's error code. These types only
//! cover broken call contracts and exceptions raised by host callbacks.

use thiserror::Error;

/// A call did not match the operation's parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bad arguments")]
pub struct ArgumentError {
    /// Position of the offending argument.
    pub position: usize,
}

/// Errors raised synchronously by [`Module`](crate::Module) calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Missing or mistyped argument.
    #[error(transparent)]
    BadArguments(#[from] ArgumentError),

    /// No constructor with this name.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// The receiver has no method with this name.
    #[error("{class} has no method {method}")]
    UnknownMethod {
        /// Class of the receiver.
        class: &'static str,
        /// Requested method.
        method: String,
    },
}

/// Exception thrown by a host function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostException {
    /// Exception message.
    pub message: String,
}

impl HostException {
    /// Creates an exception with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A completion callback threw while the host loop delivered it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("uncaught exception in open callback #{ticket}: {source}")]
pub struct UncaughtException {
    /// Ticket of the async open whose callback threw.
    pub ticket: u64,
    /// What the callback threw.
    pub source: HostException,
}
