//! Cart types.
//!
//! A cart collects items added from the order modal. Lines are keyed by item
//! id: adding an item that is already in the cart increases its quantity.

use crate::{current_timestamp, Item};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
	pub item: Item,
	pub quantity: u32,
}

impl CartLine {
	pub fn total(&self) -> f64 {
		self.item.unit_price * self.quantity as f64
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
	pub lines: Vec<CartLine>,
	/// Unix seconds of the last change, 0 for a cart that was never written.
	#[serde(default)]
	pub updated_at: u64,
}

impl Cart {
	/// Adds `quantity` units of `item`, merging with an existing line.
	///
	/// The stored item is refreshed so the cart reflects the latest price.
	pub fn add(&mut self, item: Item, quantity: u32) {
		let quantity = quantity.max(1);
		match self.lines.iter_mut().find(|line| line.item.id == item.id) {
			Some(line) => {
				line.quantity = line.quantity.saturating_add(quantity);
				line.item = item;
			}
			None => self.lines.push(CartLine { item, quantity }),
		}
		self.updated_at = current_timestamp();
	}

	/// Removes the line for `item_id`. Returns whether a line was removed.
	pub fn remove(&mut self, item_id: &str) -> bool {
		let before = self.lines.len();
		self.lines.retain(|line| line.item.id != item_id);
		let removed = self.lines.len() != before;
		if removed {
			self.updated_at = current_timestamp();
		}
		removed
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	/// Total number of units across all lines.
	pub fn item_count(&self) -> u64 {
		self.lines.iter().map(|line| line.quantity as u64).sum()
	}

	pub fn total(&self) -> f64 {
		self.lines.iter().map(CartLine::total).sum()
	}
}
