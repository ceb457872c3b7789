//! Scope-owned resources: cancellation handles, watch subscriptions, and the
//! shared resize coordinator.

pub mod config;
mod handles;
pub mod resize;
pub mod scope;

pub use config::{LIFECYCLE_CONFIG_JSON_SCHEMA_V1, LifecycleConfig, LifecycleConfigJsonContractV1};
pub use handles::{CancelHandle, Subscription};
pub use resize::{ResizeCallback, ResizeCoordinator, ResizeStats};
pub use scope::Scope;
