//! Error types used by the multiplexer and its transports.
//!
//! This module defines two enums:
//!
//! - [`MuxError`]: raised while building a [`Multiplexer`](crate::Multiplexer).
//! - [`TransportError`]: raised by a [`Transport`](crate::Transport) when it cannot open a subscription.
//!
//! Neither type ever reaches a `subscribe` caller: transport failures are retried
//! in the background and only show up in logs and lifecycle events.
//! Both types provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while constructing the multiplexer.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MuxError {
    /// A configuration field holds a value the reconnect machinery cannot work with.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The cool-down must outlast the longest exponential delay.
    #[error("cooldown {cooldown:?} is shorter than the max backoff delay {max:?}")]
    CooldownTooShort {
        /// Configured cool-down.
        cooldown: Duration,
        /// Configured max backoff delay.
        max: Duration,
    },

    /// `build()` was called outside a tokio runtime.
    #[error("no tokio runtime available; build the multiplexer from within a runtime")]
    NoRuntime,
}

impl MuxError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use changemux::MuxError;
    ///
    /// assert_eq!(MuxError::NoRuntime.as_label(), "mux_no_runtime");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            MuxError::InvalidConfig { .. } => "mux_invalid_config",
            MuxError::CooldownTooShort { .. } => "mux_cooldown_too_short",
            MuxError::NoRuntime => "mux_no_runtime",
        }
    }
}

/// # Errors produced by a transport when opening a subscription.
///
/// Every variant is handled the same way by the lifecycle controller: the open
/// is rescheduled after [`MuxConfig::open_retry_delay`](crate::MuxConfig::open_retry_delay).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The change stream is not reachable right now.
    #[error("transport unavailable: {reason}")]
    Unavailable {
        /// Transport-provided detail.
        reason: String,
    },

    /// The change stream refused the subscription.
    #[error("subscription rejected: {reason}")]
    Rejected {
        /// Transport-provided detail.
        reason: String,
    },

    /// The transport panicked inside `open`; the panic was caught.
    #[error("transport panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use changemux::TransportError;
    ///
    /// let err = TransportError::Unavailable { reason: "socket closed".into() };
    /// assert_eq!(err.as_label(), "transport_unavailable");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Unavailable { .. } => "transport_unavailable",
            TransportError::Rejected { .. } => "transport_rejected",
            TransportError::Panicked { .. } => "transport_panicked",
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
