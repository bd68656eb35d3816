//! Events reported by the order flow.
//!
//! Each action on an order context returns the events it produced, in the
//! order they happened. The caller (a UI layer or the HTTP session API) reacts
//! to them: toggling the modal, showing a toast, or writing to the cart.

use crate::{Item, OrderConfirmation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
	/// The order modal was opened or closed.
	ModalChanged { open: bool },
	/// The configured item should be added to the user's cart.
	AddedToCart { item: Item, quantity: u32 },
	/// The order was accepted by the order API.
	Succeeded { confirmation: OrderConfirmation },
	/// A user-facing error.
	Failed { message: String },
}

impl OrderEvent {
	pub fn failed(message: impl Into<String>) -> Self {
		OrderEvent::Failed {
			message: message.into(),
		}
	}

	pub fn is_failure(&self) -> bool {
		matches!(self, OrderEvent::Failed { .. })
	}

	pub fn is_success(&self) -> bool {
		matches!(self, OrderEvent::Succeeded { .. })
	}
}
