//! Concrete collaborator adapters.
//!
//! The pipeline consumes collaborators through the traits in
//! [`crate::core::stage`]; this module holds the implementations shipped
//! with the crate.

pub mod webhook;

pub use webhook::{WebhookConfig, WebhookTransport};
