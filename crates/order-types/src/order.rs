//! Types exchanged with the remote order API.

use serde::{Deserialize, Serialize};

/// Body of an order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
	pub user_id: String,
	pub vendor_id: String,
	pub item_id: String,
	pub quantity: u32,
	pub unit_price: f64,
	pub pickup_point: String,
}

impl OrderPayload {
	pub fn total_price(&self) -> f64 {
		self.unit_price * self.quantity as f64
	}
}

/// Answer of the order API to an accepted submission.
///
/// `checkout_url` is an opaque payment gateway address the client is
/// redirected to; the order flow never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
	pub order_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub checkout_url: Option<String>,
}

/// A confirmed order as kept in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
	pub confirmation: OrderConfirmation,
	pub payload: OrderPayload,
	/// Unix seconds when the confirmation was received.
	pub confirmed_at: u64,
}
