//! Role-based shipment approval lifecycle engine.
//!
//! Shipments are created by clearance managers, reviewed by accounts
//! (approve / reject / request changes), and gated on mode-specific
//! mandatory documents before approval. All state lives in an embedded
//! sled store; audit logging and notifications are best-effort side
//! effects that never block a transition.

pub mod audit;
pub mod documents;
pub mod error;
pub mod notify;
pub mod service;
pub mod shipment;
pub mod types;
pub mod utils;

pub use error::{Error, Result, ValidationError};
