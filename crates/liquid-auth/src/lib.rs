//! Credential handling and request signing for the Liquid API
//!
//! This crate produces the `X-Quoine-Auth` signature header required for
//! private operations, both on the REST surface and for the realtime
//! authentication handshake.
//!
//! # Example
//!
//! ```
//! use liquid_auth::{Credentials, RequestDescriptor, SIGNATURE_HEADER};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let creds = Credentials::new("123456", "super-secret")?;
//! let headers = creds.sign_request(&RequestDescriptor::get("/realtime"))?;
//! assert!(headers.contains_key(SIGNATURE_HEADER));
//! # Ok(())
//! # }
//! ```

mod credentials;
mod error;

pub use credentials::{Credentials, Method, RequestDescriptor, SIGNATURE_HEADER};
pub use error::{AuthError, AuthResult};
