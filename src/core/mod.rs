//! Core module - client configuration and persisted identity
//!
//! - [`ClientConfig`] - server endpoint and reconnect tunables, loaded from JSON
//! - [`IdentityStore`] - durable get/set store for the player id, last game id
//!   and display name
//! - [`CoreError`] - errors raised while loading or saving either of them

pub mod config;
pub mod error;
pub mod identity;

// Re-export commonly used items
pub use config::{ClientConfig, ReconnectPolicy};
pub use error::{CoreError, CoreResult};
pub use identity::{
    FileIdentityStore, IdentityKey, IdentityStore, LocalIdentity, MemoryIdentityStore,
};
