//! Registry of live ordering sessions.
//!
//! Every lookup refreshes a session's last-touched time; sessions left alone
//! longer than the idle timeout are evicted by [`SessionRegistry::evict_idle`].

use crate::state::OrderContext;
use order_types::OrderState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

pub type SessionId = String;

/// A session's order context, shared between requests.
pub type SharedContext = Arc<Mutex<OrderContext>>;

struct SessionEntry {
	context: SharedContext,
	last_touched: Instant,
}

#[derive(Default)]
pub struct SessionRegistry {
	sessions: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `context` under a fresh id.
	pub async fn create(&self, context: OrderContext) -> SessionId {
		let id = Uuid::new_v4().to_string();
		self.sessions.write().await.insert(
			id.clone(),
			SessionEntry {
				context: Arc::new(Mutex::new(context)),
				last_touched: Instant::now(),
			},
		);
		id
	}

	/// Returns the session's context and marks the session as used.
	pub async fn get(&self, id: &str) -> Option<SharedContext> {
		let mut sessions = self.sessions.write().await;
		let entry = sessions.get_mut(id)?;
		entry.last_touched = Instant::now();
		Some(entry.context.clone())
	}

	/// Removes a session. Requests already holding its context keep working
	/// on their copy of the handle.
	pub async fn remove(&self, id: &str) -> Option<SharedContext> {
		self.sessions
			.write()
			.await
			.remove(id)
			.map(|entry| entry.context)
	}

	/// Removes sessions not used for at least `idle_timeout` and returns how
	/// many were removed. Sessions with an order in flight are kept.
	pub async fn evict_idle(&self, idle_timeout: Duration) -> usize {
		let now = Instant::now();
		let mut sessions = self.sessions.write().await;
		let before = sessions.len();
		sessions.retain(|_, entry| {
			if now.duration_since(entry.last_touched) < idle_timeout {
				return true;
			}
			// A locked context is being used right now.
			match entry.context.try_lock() {
				Ok(context) => context.state() == OrderState::Processing,
				Err(_) => true,
			}
		});
		before - sessions.len()
	}

	pub async fn len(&self) -> usize {
		self.sessions.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use order_types::Item;

	#[tokio::test]
	async fn test_create_get_remove() {
		let registry = SessionRegistry::new();
		assert!(registry.is_empty().await);

		let a = registry.create(OrderContext::default()).await;
		let b = registry.create(OrderContext::new("Library Kiosk")).await;
		assert_ne!(a, b);
		assert!(Uuid::parse_str(&a).is_ok());
		assert_eq!(registry.len().await, 2);

		let context = registry.get(&b).await.unwrap();
		assert_eq!(context.lock().await.pickup_point(), "Library Kiosk");

		assert!(registry.remove(&a).await.is_some());
		assert!(registry.remove(&a).await.is_none());
		assert!(registry.get(&a).await.is_none());
		assert_eq!(registry.len().await, 1);
	}

	#[tokio::test]
	async fn test_handles_share_one_context() {
		let registry = SessionRegistry::new();
		let id = registry.create(OrderContext::default()).await;

		let first = registry.get(&id).await.unwrap();
		let second = registry.get(&id).await.unwrap();
		first.lock().await.set_user_id("u1");

		let ctx = second.lock().await;
		assert_eq!(ctx.user_id(), Some("u1"));
		assert_eq!(ctx.state(), OrderState::Idle);
	}

	#[tokio::test(start_paused = true)]
	async fn test_evict_idle_sessions() {
		let registry = SessionRegistry::new();
		let idle = registry.create(OrderContext::default()).await;
		let active = registry.create(OrderContext::default()).await;

		tokio::time::advance(Duration::from_secs(40)).await;
		assert!(registry.get(&active).await.is_some());
		tokio::time::advance(Duration::from_secs(30)).await;

		assert_eq!(registry.evict_idle(Duration::from_secs(60)).await, 1);
		assert!(registry.get(&idle).await.is_none());
		assert!(registry.get(&active).await.is_some());
	}

	#[tokio::test(start_paused = true)]
	async fn test_evict_keeps_in_flight_and_locked_sessions() {
		let registry = SessionRegistry::new();

		let mut processing = OrderContext::default();
		processing.set_user_id("u1");
		processing.select_food(Item {
			id: "f1".into(),
			vendor_id: Some("v1".into()),
			name: "Soup".into(),
			unit_price: 3.0,
			available: true,
		});
		processing.begin_order();
		let in_flight = registry.create(processing).await;
		let locked = registry.create(OrderContext::default()).await;
		let handle = registry.get(&locked).await.unwrap();
		let _guard = handle.lock().await;

		tokio::time::advance(Duration::from_secs(120)).await;

		assert_eq!(registry.evict_idle(Duration::from_secs(60)).await, 0);
		assert_eq!(registry.len().await, 2);
		assert!(registry.remove(&in_flight).await.is_some());
	}
}
