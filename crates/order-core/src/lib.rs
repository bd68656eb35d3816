//! Core of the campus order flow.
//!
//! This crate holds the order state machine and the engine that runs it for
//! many concurrent sessions. The engine is assembled from configuration by
//! [`OrderFlowBuilder`], which plugs in the storage backend used for carts and
//! order records and the submitter that talks to the order API.

pub mod builder;
pub mod cart;
pub mod engine;
pub mod session;
pub mod state;

pub use builder::{BuilderError, OrderFlowBuilder, OrderFlowFactories};
pub use cart::{CartError, CartService};
pub use engine::{CartOwner, OrderFlow, SessionAction, SessionError};
pub use session::{SessionId, SessionRegistry, SharedContext};
pub use state::{FlowError, OrderAttempt, OrderContext};
