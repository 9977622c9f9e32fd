//! VNPay payment gateway integration.
//!
//! Builds the signed redirect URL that sends a customer to the gateway for
//! an order awaiting payment, and verifies the signed parameters the gateway
//! sends back. Signatures are HMAC-SHA512 over the parameters sorted by key.

pub mod canonical;
pub mod clock;
pub mod config;
pub mod error;
pub mod secret;
pub mod signer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::VnPayConfig;
pub use error::{PaymentError, Result};
pub use secret::Secret;
pub use signer::{PaymentOutcome, PaymentRequest, PaymentRequestSigner, verify_return};
