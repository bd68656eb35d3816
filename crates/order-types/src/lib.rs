//! Common types for the campus order flow.
//!
//! This crate defines the value types shared by every other crate in the
//! workspace: the menu item as the storefront sees it, the in-progress order
//! draft, the order states and the events the state machine reports, the
//! payload sent to the order API, and the cart persisted per user.

/// API request and response structures for the session endpoints.
pub mod api;
/// Cart types persisted per user.
pub mod cart;
/// The mutable draft of an order being configured.
pub mod draft;
/// Events produced by order flow actions.
pub mod events;
/// Menu item as read by the order flow.
pub mod item;
/// Order payloads and confirmations exchanged with the order API.
pub mod order;
/// Registry trait for pluggable implementations.
pub mod registry;
/// The closed set of order flow states.
pub mod state;
/// Storage namespaces.
pub mod storage;
/// Small helpers shared across crates.
pub mod utils;
/// Configuration validation types for implementation-specific tables.
pub mod validation;

pub use api::*;
pub use cart::*;
pub use draft::*;
pub use events::*;
pub use item::*;
pub use order::*;
pub use registry::*;
pub use state::*;
pub use storage::*;
pub use utils::{current_timestamp, truncate_id};
pub use validation::*;
