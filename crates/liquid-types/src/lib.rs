//! Shared types for the Liquid Tap realtime API
//!
//! This crate provides the domain types delivered over Tap channels and the
//! error taxonomy used across the SDK. It has minimal dependencies and can
//! be used independently.
//!
//! # Key Types
//!
//! - [`Side`] - Order-book side (buy/sell)
//! - [`OrderBookLevel`] - Single price ladder entry
//! - [`Execution`] - Trade execution event
//! - [`AccountUpdate`] - Account currency balance update
//! - [`LiquidError`] - Error types

pub mod enums;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use enums::*;
pub use error::*;
pub use models::*;

// Re-export rust_decimal for users
pub use rust_decimal::Decimal;
