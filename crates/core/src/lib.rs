//! notifyd-core - Domain logic and models for the notification outbox
//!
//! This crate contains pure domain logic with no I/O operations beyond
//! what `sqlx::Type`/`FromRow` derives require. All database models,
//! retry policy, provider contract, and error types are defined here.

pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod types;

pub use error::CoreError;
pub use models::{NewNotification, NotificationMessage, OutboxStatus, Priority};
pub use provider::{FailureCategory, Provider, SendOutcome, SendRequest};
pub use registry::ProviderRegistry;
pub use retry::RetryPolicy;
pub use types::NotificationId;
