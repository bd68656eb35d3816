//! The in-progress order draft.

use crate::Item;
use serde::{Deserialize, Serialize};

/// Pickup point used until the user picks another one.
pub const DEFAULT_PICKUP_POINT: &str = "Main Campus Cafeteria";

/// Smallest quantity a draft can hold.
pub const MIN_QUANTITY: u32 = 1;

/// Clamps a requested quantity into the range a draft accepts.
pub fn clamp_quantity(requested: i64) -> u32 {
	requested.clamp(MIN_QUANTITY as i64, u32::MAX as i64) as u32
}

/// Mutable data of the order being configured.
///
/// A draft is owned by exactly one order context. The quantity is kept at or
/// above [`MIN_QUANTITY`] by every setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
	/// The item under consideration, if any.
	pub selected_item: Option<Item>,
	/// Number of units to order.
	quantity: u32,
	/// Where the order will be picked up.
	pub pickup_point: String,
	/// The user placing the order. Set by the owning session, not by transitions.
	pub user_id: Option<String>,
	/// Whether the order modal is visible.
	pub modal_open: bool,
}

impl OrderDraft {
	/// Creates an empty draft with the given default pickup point.
	pub fn new(pickup_point: impl Into<String>) -> Self {
		Self {
			selected_item: None,
			quantity: MIN_QUANTITY,
			pickup_point: pickup_point.into(),
			user_id: None,
			modal_open: false,
		}
	}

	pub fn quantity(&self) -> u32 {
		self.quantity
	}

	/// Sets the quantity, clamping anything below one up to one.
	pub fn set_quantity(&mut self, requested: i64) {
		self.quantity = clamp_quantity(requested);
	}

	/// `unit_price * quantity` for the selected item, or 0 when nothing is selected.
	pub fn total_price(&self) -> f64 {
		self.selected_item
			.as_ref()
			.map(|item| item.unit_price * self.quantity as f64)
			.unwrap_or(0.0)
	}

	/// Clears the selection and quantity and hides the modal.
	///
	/// The pickup point and user are kept for the next order.
	pub fn reset(&mut self) {
		self.selected_item = None;
		self.quantity = MIN_QUANTITY;
		self.modal_open = false;
	}
}

impl Default for OrderDraft {
	fn default() -> Self {
		Self::new(DEFAULT_PICKUP_POINT)
	}
}
