//! Persistent carts.
//!
//! Carts are stored through the storage service under [`StorageKey::Carts`],
//! one entry per user key.

use order_storage::{StorageError, StorageService};
use order_types::{Cart, Item, StorageKey};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum CartError {
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Item {0} is not in the cart")]
	ItemNotFound(String),
}

/// Reads and updates carts in storage.
pub struct CartService {
	storage: Arc<StorageService>,
	/// Serializes read-modify-write cycles so concurrent adds are not lost.
	write_lock: Mutex<()>,
}

impl CartService {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			write_lock: Mutex::new(()),
		}
	}

	/// Returns the stored cart, or an empty one if nothing was stored.
	pub async fn get(&self, user_key: &str) -> Result<Cart, CartError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::Carts, user_key)
			.await?
			.unwrap_or_default())
	}

	/// Adds `quantity` units of `item` and returns the updated cart.
	pub async fn add(&self, user_key: &str, item: Item, quantity: u32) -> Result<Cart, CartError> {
		let _guard = self.write_lock.lock().await;

		let mut cart = self.get(user_key).await?;
		cart.add(item, quantity);
		self.storage.store(StorageKey::Carts, user_key, &cart).await?;

		tracing::debug!(
			user = %order_types::truncate_id(user_key),
			lines = cart.lines.len(),
			units = cart.item_count(),
			"Cart updated"
		);
		Ok(cart)
	}

	pub async fn remove_item(&self, user_key: &str, item_id: &str) -> Result<Cart, CartError> {
		let _guard = self.write_lock.lock().await;

		let mut cart = self.get(user_key).await?;
		if !cart.remove(item_id) {
			return Err(CartError::ItemNotFound(item_id.to_string()));
		}
		self.storage.store(StorageKey::Carts, user_key, &cart).await?;
		Ok(cart)
	}

	/// Deletes the stored cart. Clearing a cart that does not exist succeeds.
	pub async fn clear(&self, user_key: &str) -> Result<(), CartError> {
		let _guard = self.write_lock.lock().await;

		match self.storage.remove(StorageKey::Carts, user_key).await {
			Ok(()) | Err(StorageError::NotFound) => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use order_storage::implementations::memory::MemoryStorage;

	fn service() -> CartService {
		CartService::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	fn item(id: &str, price: f64) -> Item {
		Item {
			id: id.into(),
			vendor_id: Some("v1".into()),
			name: id.into(),
			unit_price: price,
			available: true,
		}
	}

	#[tokio::test]
	async fn test_empty_cart_for_unknown_user() {
		let carts = service();

		let cart = carts.get("nobody").await.unwrap();

		assert!(cart.is_empty());
		assert_eq!(cart.updated_at, 0);
	}

	#[tokio::test]
	async fn test_add_merges_and_persists() {
		let carts = service();

		carts.add("u1", item("f1", 2.0), 2).await.unwrap();
		carts.add("u1", item("f2", 5.0), 1).await.unwrap();
		carts.add("u1", item("f1", 2.0), 3).await.unwrap();

		let cart = carts.get("u1").await.unwrap();
		assert_eq!(cart.lines.len(), 2);
		assert_eq!(cart.item_count(), 6);
		assert_eq!(cart.total(), 15.0);
		assert!(carts.get("u2").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_concurrent_adds_are_not_lost() {
		let carts = Arc::new(service());

		let handles: Vec<_> = (0..16)
			.map(|_| {
				let carts = carts.clone();
				tokio::spawn(async move { carts.add("u1", item("f1", 1.0), 1).await })
			})
			.collect();
		for handle in handles {
			handle.await.unwrap().unwrap();
		}

		assert_eq!(carts.get("u1").await.unwrap().item_count(), 16);
	}

	#[tokio::test]
	async fn test_remove_item() {
		let carts = service();
		carts.add("u1", item("f1", 2.0), 1).await.unwrap();
		carts.add("u1", item("f2", 3.0), 1).await.unwrap();

		let cart = carts.remove_item("u1", "f1").await.unwrap();
		assert_eq!(cart.lines.len(), 1);
		assert_eq!(carts.get("u1").await.unwrap(), cart);

		assert!(matches!(
			carts.remove_item("u1", "f1").await,
			Err(CartError::ItemNotFound(id)) if id == "f1"
		));
	}

	#[tokio::test]
	async fn test_clear() {
		let carts = service();
		carts.add("u1", item("f1", 2.0), 1).await.unwrap();

		carts.clear("u1").await.unwrap();
		carts.clear("u1").await.unwrap();

		assert!(carts.get("u1").await.unwrap().is_empty());
	}
}
