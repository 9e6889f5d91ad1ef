//! Realtime (Tap) client for the Liquid exchange
//!
//! This crate connects caller-supplied callbacks to Liquid's Tap
//! push-messaging endpoint: order-book ladder updates, trade executions,
//! and private account updates. The pub/sub transport itself is an
//! external collaborator consumed through the [`Transport`] trait.
//!
//! # Features
//!
//! - Channel subscription registry with restoration after reconnect
//! - Automatic authentication handshake for private channels
//! - Typed per-channel decoding with an error sink for bad payloads
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use liquid_tap::{ConnectionOptions, TapClient, Transport};
//! # fn connect_transport(options: &ConnectionOptions) -> Arc<dyn Transport> { unimplemented!() }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ConnectionOptions::new("LIQUID-APP-KEY");
//!     let transport = connect_transport(&options);
//!
//!     let client = TapClient::new(options, transport);
//!     client.subscribe_executions("ethusd", |execution, symbol| {
//!         println!("{symbol}: {} @ {}", execution.quantity, execution.price);
//!     })?;
//!     client.connect();
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod channel;
pub mod client;
pub mod subscription;
pub mod transport;

// Re-export main types
pub use auth::{AuthManager, AuthState};
pub use channel::{ChannelKind, ChannelName};
pub use client::{ConnectionOptions, ErrorSink, TapClient, DEFAULT_RESPONSE_TIMEOUT, TAP_ENDPOINT};
pub use subscription::{SubscriptionHandle, SubscriptionManager};
pub use transport::{MockTransport, Transport, TransportError, TransportState};

// Re-export the domain types callers receive
pub use liquid_types::{
    AccountUpdate, Execution, LiquidError, LiquidResult, OrderBookLevel, ProductUpdate, Side,
    UserUpdate,
};
