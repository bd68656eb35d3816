//! The order flow state machine.
//!
//! An [`OrderContext`] owns the draft of one order and the state it is in.
//! Every UI action goes through the context, which dispatches on the current
//! [`OrderState`](order_types::OrderState) and reports what happened as a list
//! of [`OrderEvent`](order_types::OrderEvent)s.

pub mod context;

pub use context::{FlowError, OrderAttempt, OrderContext};
