//! Error types for the Liquid Tap SDK

use std::time::Duration;
use thiserror::Error;

/// Main error type for Liquid Tap operations
#[derive(Error, Debug)]
pub enum LiquidError {
    // === Configuration Errors ===
    /// Operation requires configuration that is missing
    ///
    /// Fatal to the failing call, not to the client. The canonical case is
    /// a private-channel subscription without credentials configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // === Decode Errors ===
    /// Failed to decode a payload on a bound channel event
    ///
    /// Reported to the error sink; dispatch for other channels continues.
    #[error("Failed to decode '{event}' payload on channel {channel}: {source}")]
    Decode {
        channel: String,
        event: String,
        #[source]
        source: serde_json::Error,
    },

    // === Authentication Errors ===
    /// The authentication handshake was rejected by the exchange
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    /// No auth success/failure event arrived within the response timeout
    #[error("Authentication timed out after {timeout:?}")]
    AuthTimeout { timeout: Duration },

    // === Transport Errors ===
    /// Error surfaced by the transport collaborator
    #[error("Transport error: {0}")]
    Transport(String),

    // === Internal Errors ===
    /// The client is shutting down
    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl LiquidError {
    /// Returns true if a fresh authentication handshake could clear this error
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::AuthTimeout { .. }
        )
    }

    /// Returns true if this error is local to a single event
    ///
    /// Local errors never abort the client or other subscriptions.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Create a decode error for a channel event
    pub fn decode(
        channel: impl Into<String>,
        event: impl Into<String>,
        source: serde_json::Error,
    ) -> Self {
        Self::Decode {
            channel: channel.into(),
            event: event.into(),
            source,
        }
    }

    /// Create an authentication failure error
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }
}

/// Result type alias for Liquid Tap operations
pub type LiquidResult<T> = Result<T, LiquidError>;
