//! Pub/sub transport abstraction
//!
//! The Tap endpoint speaks a Pusher-style protocol; framing, TLS, and
//! automatic reconnection belong to the transport collaborator, not to
//! this crate. The client consumes the outbound surface through the
//! [`Transport`] trait; inbound delivery goes the other way, with the
//! transport driver invoking the client's `handle_*` methods from its own
//! delivery thread.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Transport connection state, as reported by the collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Connection in progress
    Connecting,
    /// Connected and ready
    Connected,
    /// Connection lost
    Disconnected,
    /// Collaborator is re-establishing the connection
    Reconnecting,
}

/// Errors surfaced by the transport collaborator
#[derive(Error, Debug)]
pub enum TransportError {
    /// Operation attempted without a connection
    #[error("not connected")]
    NotConnected,

    /// Channel subscribe failed
    #[error("subscribe failed for {channel}: {reason}")]
    SubscribeFailed { channel: String, reason: String },

    /// Raw message send failed
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Outbound surface of the pub/sub collaborator
///
/// Implementations are expected to auto-reconnect and to re-emit
/// connection-state events through the client's lifecycle handlers; this
/// crate never implements its own reconnect loop.
pub trait Transport: Send + Sync {
    /// Open the connection
    fn connect(&self);

    /// Close the connection
    fn disconnect(&self);

    /// Subscribe to a named channel
    fn subscribe(&self, channel: &str) -> Result<(), TransportError>;

    /// Unsubscribe from a named channel
    fn unsubscribe(&self, channel: &str) -> Result<(), TransportError>;

    /// Send a raw control-plane message (not tied to a channel)
    fn send_raw(&self, payload: &str) -> Result<(), TransportError>;
}

/// Mock transport for testing
///
/// Records outbound calls so tests can assert on subscribe/replay
/// behavior and on the exact control-plane payloads sent.
#[derive(Debug, Default)]
pub struct MockTransport {
    connected: Mutex<bool>,
    /// Channels passed to subscribe(), in call order
    subscribed: Mutex<Vec<String>>,
    /// Channels passed to unsubscribe(), in call order
    unsubscribed: Mutex<Vec<String>>,
    /// Payloads passed to send_raw(), in call order
    sent: Mutex<Vec<String>>,
    /// Simulate subscribe failures
    fail_subscribe: Mutex<bool>,
    /// Simulate send_raw failures
    fail_send: Mutex<bool>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Channels subscribed so far
    pub fn subscribe_calls(&self) -> Vec<String> {
        self.subscribed.lock().clone()
    }

    /// Channels unsubscribed so far
    pub fn unsubscribe_calls(&self) -> Vec<String> {
        self.unsubscribed.lock().clone()
    }

    /// Raw messages sent so far
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Drain recorded subscribe calls
    pub fn take_subscribe_calls(&self) -> Vec<String> {
        std::mem::take(&mut self.subscribed.lock())
    }

    /// Make subsequent subscribe calls fail
    pub fn set_fail_subscribe(&self, fail: bool) {
        *self.fail_subscribe.lock() = fail;
    }

    /// Make subsequent send_raw calls fail
    pub fn set_fail_send(&self, fail: bool) {
        *self.fail_send.lock() = fail;
    }

    /// Whether connect() has been called
    pub fn is_connected(&self) -> bool {
        *self.connected.lock()
    }
}

impl Transport for MockTransport {
    fn connect(&self) {
        *self.connected.lock() = true;
    }

    fn disconnect(&self) {
        *self.connected.lock() = false;
    }

    fn subscribe(&self, channel: &str) -> Result<(), TransportError> {
        if *self.fail_subscribe.lock() {
            return Err(TransportError::SubscribeFailed {
                channel: channel.to_string(),
                reason: "mock subscribe failure".into(),
            });
        }
        self.subscribed.lock().push(channel.to_string());
        Ok(())
    }

    fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        self.unsubscribed.lock().push(channel.to_string());
        Ok(())
    }

    fn send_raw(&self, payload: &str) -> Result<(), TransportError> {
        if *self.fail_send.lock() {
            return Err(TransportError::SendFailed("mock send failure".into()));
        }
        self.sent.lock().push(payload.to_string());
        Ok(())
    }
}
