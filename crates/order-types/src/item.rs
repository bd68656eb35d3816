//! Menu item types.

use serde::{Deserialize, Serialize};

/// A menu item offered by a vendor.
///
/// The order flow never mutates an item; it only reads availability and price
/// when deciding whether the item can be selected or ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
	/// Unique identifier of the item.
	pub id: String,
	/// Identifier of the vendor selling this item.
	///
	/// Orders cannot be submitted for items without a vendor.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vendor_id: Option<String>,
	/// Display name, used in user-facing messages.
	#[serde(default)]
	pub name: String,
	/// Price per unit. Zero or negative means the price is not determined yet.
	pub unit_price: f64,
	/// Whether the vendor currently offers this item.
	pub available: bool,
}

impl Item {
	/// Returns true if the item has a usable price.
	pub fn has_price(&self) -> bool {
		self.unit_price > 0.0
	}

	/// Name used in notifications, falling back to the id for unnamed items.
	pub fn display_name(&self) -> &str {
		if self.name.is_empty() {
			&self.id
		} else {
			&self.name
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_deserialize_camel_case() {
		let json = r#"{"id":"f1","vendorId":"v1","name":"Fried Rice","unitPrice":4.5,"available":true}"#;
		let item: Item = serde_json::from_str(json).unwrap();

		assert_eq!(item.id, "f1");
		assert_eq!(item.vendor_id.as_deref(), Some("v1"));
		assert_eq!(item.unit_price, 4.5);
		assert!(item.available);
	}

	#[test]
	fn test_missing_vendor_and_name_default() {
		let json = r#"{"id":"f2","unitPrice":0,"available":false}"#;
		let item: Item = serde_json::from_str(json).unwrap();

		assert!(item.vendor_id.is_none());
		assert!(!item.has_price());
		assert_eq!(item.display_name(), "f2");
	}
}
