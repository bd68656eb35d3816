//! The order flow engine.
//!
//! [`OrderFlow`] owns the services built from configuration and the registry
//! of live sessions. Every session action goes through it: it locks the
//! session's context, applies the action, and acts on the resulting events
//! (writing carts, recording confirmed orders).

use crate::cart::{CartError, CartService};
use crate::session::{SessionRegistry, SharedContext};
use crate::state::{OrderAttempt, OrderContext};
use order_config::Config;
use order_storage::{StorageError, StorageService};
use order_submit::SubmitService;
use order_types::{
	current_timestamp, truncate_id, ActionResponse, Cart, Item, OrderEvent, OrderRecord,
	SessionView, StorageKey,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::instrument;

const CART_UPDATE_FAILED_MESSAGE: &str = "Could not update your cart. Please try again.";

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("Session not found: {0}")]
	NotFound(String),
	#[error("Cart error: {0}")]
	Cart(#[from] CartError),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// A user action forwarded to a session's order context.
#[derive(Debug, Clone)]
pub enum SessionAction {
	SetUser { user_id: String },
	SelectFood { item: Item },
	UpdateQuantity { quantity: i64 },
	SelectPickupPoint { pickup_point: String },
	AddToCart,
	CloseModal,
}

impl SessionAction {
	fn name(&self) -> &'static str {
		match self {
			SessionAction::SetUser { .. } => "set_user",
			SessionAction::SelectFood { .. } => "select_food",
			SessionAction::UpdateQuantity { .. } => "update_quantity",
			SessionAction::SelectPickupPoint { .. } => "select_pickup_point",
			SessionAction::AddToCart => "add_to_cart",
			SessionAction::CloseModal => "close_modal",
		}
	}
}

/// Whose cart a request reads or writes.
///
/// Users and anonymous sessions have separate key spaces, so a user id can
/// never name a session's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
	User(String),
	Session(String),
}

impl CartOwner {
	/// The owner of a session's cart: its user, or the session itself.
	fn for_session(session_id: &str, context: &OrderContext) -> Self {
		match context.user_id() {
			Some(user_id) => CartOwner::User(user_id.to_string()),
			None => CartOwner::Session(session_id.to_string()),
		}
	}

	fn storage_key(&self) -> String {
		match self {
			CartOwner::User(id) => format!("user:{}", id),
			CartOwner::Session(id) => format!("session:{}", id),
		}
	}
}

fn session_view(session_id: &str, context: &OrderContext) -> SessionView {
	SessionView {
		session_id: session_id.to_string(),
		state: context.state(),
		draft: context.draft().clone(),
		total_price: context.total_price(),
		can_modify_order: context.can_modify_order(),
		can_place_order: context.can_place_order(),
	}
}

/// The built order flow with its services and sessions.
#[derive(Clone)]
pub struct OrderFlow {
	config: Config,
	storage: Arc<StorageService>,
	submit: Arc<SubmitService>,
	carts: Arc<CartService>,
	sessions: Arc<SessionRegistry>,
}

impl OrderFlow {
	pub fn new(config: Config, storage: Arc<StorageService>, submit: Arc<SubmitService>) -> Self {
		let carts = Arc::new(CartService::new(storage.clone()));
		Self {
			config,
			storage,
			submit,
			carts,
			sessions: Arc::new(SessionRegistry::new()),
		}
	}

	/// A fresh Idle context with the configured defaults.
	pub fn new_context(&self) -> OrderContext {
		OrderContext::new(self.config.flow.default_pickup_point.clone())
			.with_submit_error_message(self.config.flow.submit_error_message.clone())
	}

	pub async fn create_session(&self, user_id: Option<String>) -> SessionView {
		let mut context = self.new_context();
		if let Some(user_id) = user_id {
			context.set_user_id(user_id);
		}
		let view_context = context.clone();
		let id = self.sessions.create(context).await;

		tracing::info!(session = %truncate_id(&id), "Session created");
		session_view(&id, &view_context)
	}

	pub async fn view(&self, session_id: &str) -> Result<SessionView, SessionError> {
		let context = self.session(session_id).await?;
		let context = context.lock().await;
		Ok(session_view(session_id, &context))
	}

	pub async fn close_session(&self, session_id: &str) -> Result<(), SessionError> {
		self.sessions
			.remove(session_id)
			.await
			.ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
		tracing::info!(session = %truncate_id(session_id), "Session closed");
		Ok(())
	}

	/// Applies a synchronous action to a session.
	#[instrument(skip_all, fields(session = %truncate_id(session_id), action = action.name()))]
	pub async fn apply(
		&self,
		session_id: &str,
		action: SessionAction,
	) -> Result<ActionResponse, SessionError> {
		let context = self.session(session_id).await?;

		let (mut events, owner, view) = {
			let mut context = context.lock().await;
			let events = match action {
				SessionAction::SetUser { user_id } => {
					context.set_user_id(user_id);
					Vec::new()
				}
				SessionAction::SelectFood { item } => context.select_food(item),
				SessionAction::UpdateQuantity { quantity } => context.update_quantity(quantity),
				SessionAction::SelectPickupPoint { pickup_point } => {
					context.select_pickup_point(pickup_point)
				}
				SessionAction::AddToCart => context.add_to_cart(),
				SessionAction::CloseModal => context.close_modal(),
			};
			(
				events,
				CartOwner::for_session(session_id, &context),
				session_view(session_id, &context),
			)
		};

		self.write_carts(&owner, &mut events).await;
		if events.iter().any(OrderEvent::is_failure) {
			tracing::debug!(state = ?view.state, "Action reported a failure");
		}

		Ok(ActionResponse {
			session: view,
			events,
		})
	}

	/// Places the order configured in a session.
	///
	/// The session's context is not locked while the submission is in flight.
	/// Other requests for the session see it in Processing and have no effect.
	#[instrument(skip_all, fields(session = %truncate_id(session_id)))]
	pub async fn place_order(&self, session_id: &str) -> Result<ActionResponse, SessionError> {
		let context = self.session(session_id).await?;

		let attempt = context.lock().await.begin_order();

		let events = match attempt {
			OrderAttempt::Submit(payload) => {
				let outcome = self.submit.submit(&payload).await;
				let events = context.lock().await.finish_order(outcome);
				if events.iter().any(OrderEvent::is_failure) {
					tracing::warn!(item_id = %payload.item_id, "Order submission failed");
				}
				for event in &events {
					if let OrderEvent::Succeeded { confirmation } = event {
						self.record_order(OrderRecord {
							confirmation: confirmation.clone(),
							payload: payload.clone(),
							confirmed_at: current_timestamp(),
						})
						.await;
					}
				}
				events
			}
			OrderAttempt::Rejected(events) => events,
			OrderAttempt::Ignored => Vec::new(),
		};

		let view = session_view(session_id, &*context.lock().await);
		Ok(ActionResponse {
			session: view,
			events,
		})
	}

	pub async fn get_cart(&self, owner: &CartOwner) -> Result<Cart, SessionError> {
		Ok(self.carts.get(&owner.storage_key()).await?)
	}

	/// The cart a session's additions currently go to.
	pub async fn session_cart(&self, session_id: &str) -> Result<(CartOwner, Cart), SessionError> {
		let context = self.session(session_id).await?;
		let owner = CartOwner::for_session(session_id, &*context.lock().await);
		let cart = self.get_cart(&owner).await?;
		Ok((owner, cart))
	}

	/// Drops one line from a cart and returns the updated cart.
	pub async fn remove_cart_item(
		&self,
		owner: &CartOwner,
		item_id: &str,
	) -> Result<Cart, SessionError> {
		Ok(self
			.carts
			.remove_item(&owner.storage_key(), item_id)
			.await?)
	}

	pub async fn clear_cart(&self, owner: &CartOwner) -> Result<(), SessionError> {
		Ok(self.carts.clear(&owner.storage_key()).await?)
	}

	/// Looks up a confirmed order by the id the order API assigned.
	pub async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, SessionError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::Orders, order_id)
			.await?)
	}

	/// Removes sessions idle for longer than the configured timeout.
	pub async fn evict_idle_sessions(&self) -> usize {
		let idle_timeout = Duration::from_secs(self.config.flow.session_idle_timeout_seconds);
		let evicted = self.sessions.evict_idle(idle_timeout).await;
		if evicted > 0 {
			tracing::info!(evicted, "Evicted idle sessions");
		}
		evicted
	}

	/// Spawns the periodic cleanup task. Each tick evicts idle sessions and
	/// sweeps expired storage entries.
	pub fn spawn_cleanup(&self) -> JoinHandle<()> {
		let flow = self.clone();
		let period = Duration::from_secs(self.config.storage.cleanup_interval_seconds.max(1));
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);
			loop {
				interval.tick().await;
				flow.evict_idle_sessions().await;
				match flow.storage.cleanup_expired().await {
					Ok(count) if count > 0 => {
						tracing::debug!(count, "Storage cleanup removed expired entries");
					}
					Err(e) => {
						tracing::warn!(error = %e, "Storage cleanup failed");
					}
					_ => {}
				}
			}
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	pub fn sessions(&self) -> &Arc<SessionRegistry> {
		&self.sessions
	}

	async fn session(&self, session_id: &str) -> Result<SharedContext, SessionError> {
		self.sessions
			.get(session_id)
			.await
			.ok_or_else(|| SessionError::NotFound(session_id.to_string()))
	}

	/// Writes every `AddedToCart` event to `owner`'s cart.
	///
	/// A failed write is reported to the user as a `Failed` event.
	async fn write_carts(&self, owner: &CartOwner, events: &mut Vec<OrderEvent>) {
		let cart_key = owner.storage_key();
		let mut failed = false;
		for event in events.iter() {
			if let OrderEvent::AddedToCart { item, quantity } = event {
				if let Err(e) = self.carts.add(&cart_key, item.clone(), *quantity).await {
					tracing::error!(
						cart = %truncate_id(&cart_key),
						item_id = %item.id,
						error = %e,
						"Failed to update cart"
					);
					failed = true;
				}
			}
		}
		if failed {
			events.push(OrderEvent::failed(CART_UPDATE_FAILED_MESSAGE));
		}
	}

	async fn record_order(&self, record: OrderRecord) {
		let order_id = record.confirmation.order_id.clone();
		if let Err(e) = self
			.storage
			.store(StorageKey::Orders, &order_id, &record)
			.await
		{
			tracing::error!(order_id = %order_id, error = %e, "Failed to record order");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use order_config::test_config;
	use order_storage::implementations::memory::MemoryStorage;
	use order_storage::StorageInterface;
	use order_submit::implementations::mock::MockSubmitter;
	use order_types::OrderState;

	fn item(id: &str, price: f64) -> Item {
		Item {
			id: id.into(),
			vendor_id: Some("v1".into()),
			name: format!("Dish {}", id),
			unit_price: price,
			available: true,
		}
	}

	fn flow_with(mock: MockSubmitter) -> OrderFlow {
		OrderFlow::new(
			test_config(),
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			Arc::new(SubmitService::new(Box::new(mock))),
		)
	}

	async fn configured_session(flow: &OrderFlow, user: Option<&str>) -> String {
		let view = flow.create_session(user.map(String::from)).await;
		flow.apply(
			&view.session_id,
			SessionAction::SelectFood {
				item: item("f1", 100.0),
			},
		)
		.await
		.unwrap();
		flow.apply(&view.session_id, SessionAction::UpdateQuantity { quantity: 2 })
			.await
			.unwrap();
		view.session_id
	}

	#[tokio::test]
	async fn test_create_session_uses_configured_defaults() {
		let mut config = test_config();
		config.flow.default_pickup_point = "Library Kiosk".into();
		let flow = OrderFlow::new(
			config,
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			Arc::new(SubmitService::new(Box::new(MockSubmitter::accepting()))),
		);

		let view = flow.create_session(Some("u1".into())).await;

		assert_eq!(view.state, OrderState::Idle);
		assert_eq!(view.draft.pickup_point, "Library Kiosk");
		assert_eq!(view.draft.user_id.as_deref(), Some("u1"));
		assert_eq!(flow.view(&view.session_id).await.unwrap().session_id, view.session_id);
		assert_eq!(flow.sessions().len().await, 1);
	}

	#[tokio::test]
	async fn test_unknown_session() {
		let flow = flow_with(MockSubmitter::accepting());

		assert!(matches!(flow.view("nope").await, Err(SessionError::NotFound(_))));
		assert!(matches!(
			flow.apply("nope", SessionAction::AddToCart).await,
			Err(SessionError::NotFound(_))
		));
		assert!(matches!(flow.place_order("nope").await, Err(SessionError::NotFound(_))));
		assert!(matches!(flow.close_session("nope").await, Err(SessionError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_add_to_cart_writes_user_cart() {
		let flow = flow_with(MockSubmitter::accepting());
		let id = configured_session(&flow, Some("u1")).await;

		let response = flow.apply(&id, SessionAction::AddToCart).await.unwrap();

		assert_eq!(response.session.state, OrderState::Idle);
		assert_eq!(response.events.len(), 2);
		let cart = flow.get_cart(&CartOwner::User("u1".into())).await.unwrap();
		assert_eq!(cart.item_count(), 2);
		assert_eq!(cart.total(), 200.0);

		let cart = flow
			.remove_cart_item(&CartOwner::User("u1".into()), "f1")
			.await
			.unwrap();
		assert!(cart.is_empty());
		assert!(matches!(
			flow.remove_cart_item(&CartOwner::User("u1".into()), "f1").await,
			Err(SessionError::Cart(CartError::ItemNotFound(_)))
		));
	}

	#[tokio::test]
	async fn test_add_to_cart_without_user_uses_session_cart() {
		let flow = flow_with(MockSubmitter::accepting());
		let id = configured_session(&flow, None).await;

		flow.apply(&id, SessionAction::AddToCart).await.unwrap();

		let owner = CartOwner::Session(id.clone());
		let (session_owner, cart) = flow.session_cart(&id).await.unwrap();
		assert_eq!(session_owner, owner);
		assert_eq!(cart.item_count(), 2);
		flow.clear_cart(&owner).await.unwrap();
		assert!(flow.get_cart(&owner).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_user_and_session_carts_are_separate() {
		let flow = flow_with(MockSubmitter::accepting());
		let anonymous = configured_session(&flow, None).await;
		flow.apply(&anonymous, SessionAction::AddToCart).await.unwrap();

		// A user whose id equals the session id still gets a cart of their own.
		let user = configured_session(&flow, Some(anonymous.as_str())).await;
		flow.apply(&user, SessionAction::AddToCart).await.unwrap();

		let user_cart = flow
			.get_cart(&CartOwner::User(anonymous.clone()))
			.await
			.unwrap();
		let session_cart = flow
			.get_cart(&CartOwner::Session(anonymous.clone()))
			.await
			.unwrap();
		assert_eq!(user_cart.item_count(), 2);
		assert_eq!(session_cart.item_count(), 2);

		flow.clear_cart(&CartOwner::User(anonymous.clone())).await.unwrap();
		assert_eq!(
			flow.get_cart(&CartOwner::Session(anonymous))
				.await
				.unwrap()
				.item_count(),
			2
		);
	}

	#[tokio::test]
	async fn test_place_order_records_confirmation() {
		let mock = MockSubmitter::accepting();
		let flow = flow_with(mock.clone());
		let id = configured_session(&flow, Some("u1")).await;

		let response = flow.place_order(&id).await.unwrap();

		assert_eq!(response.session.state, OrderState::Completed);
		let confirmation = match response.events.as_slice() {
			[OrderEvent::Succeeded { confirmation }] => confirmation.clone(),
			other => panic!("unexpected events: {:?}", other),
		};
		let record = flow.get_order(&confirmation.order_id).await.unwrap().unwrap();
		assert_eq!(record.payload, mock.submitted().await[0]);
		assert_eq!(record.payload.quantity, 2);
		assert!(flow.get_order("unknown").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_place_order_failure_keeps_draft() {
		let flow = flow_with(MockSubmitter::rejecting("Network error"));
		let id = configured_session(&flow, Some("u1")).await;

		let response = flow.place_order(&id).await.unwrap();

		assert_eq!(response.session.state, OrderState::Configuring);
		assert_eq!(response.events, vec![OrderEvent::failed("Network error")]);
		assert_eq!(response.session.draft.quantity(), 2);
	}

	#[tokio::test]
	async fn test_place_order_without_user() {
		let mock = MockSubmitter::accepting();
		let flow = flow_with(mock.clone());
		let id = configured_session(&flow, None).await;

		let response = flow.place_order(&id).await.unwrap();

		assert_eq!(
			response.events,
			vec![OrderEvent::failed("Please log in to place an order")]
		);
		assert!(mock.submitted().await.is_empty());

		flow.apply(&id, SessionAction::SetUser { user_id: "u1".into() })
			.await
			.unwrap();
		let response = flow.place_order(&id).await.unwrap();
		assert_eq!(response.session.state, OrderState::Completed);
	}

	#[tokio::test(start_paused = true)]
	async fn test_session_locked_while_submitting() {
		let mock = MockSubmitter::accepting().with_delay(Duration::from_millis(50));
		let flow = flow_with(mock.clone());
		let id = configured_session(&flow, Some("u1")).await;

		let pending = {
			let flow = flow.clone();
			let id = id.clone();
			tokio::spawn(async move { flow.place_order(&id).await })
		};
		tokio::time::sleep(Duration::from_millis(10)).await;

		let view = flow.view(&id).await.unwrap();
		assert_eq!(view.state, OrderState::Processing);
		assert!(!view.can_modify_order);

		let edit = flow
			.apply(&id, SessionAction::UpdateQuantity { quantity: 9 })
			.await
			.unwrap();
		assert!(edit.events.is_empty());
		assert_eq!(edit.session.draft.quantity(), 2);

		let close = flow.apply(&id, SessionAction::CloseModal).await.unwrap();
		assert!(close.events.is_empty());

		let second = flow.place_order(&id).await.unwrap();
		assert!(second.events.is_empty());
		assert_eq!(second.session.state, OrderState::Processing);

		let first = pending.await.unwrap().unwrap();
		assert_eq!(first.session.state, OrderState::Completed);
		assert_eq!(first.events.iter().filter(|e| e.is_success()).count(), 1);
		assert_eq!(mock.submitted().await.len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_closed_session_finishes_in_flight_order() {
		let mock = MockSubmitter::accepting().with_delay(Duration::from_millis(50));
		let flow = flow_with(mock);
		let id = configured_session(&flow, Some("u1")).await;

		let pending = {
			let flow = flow.clone();
			let id = id.clone();
			tokio::spawn(async move { flow.place_order(&id).await })
		};
		tokio::time::sleep(Duration::from_millis(10)).await;
		flow.close_session(&id).await.unwrap();

		let response = pending.await.unwrap().unwrap();
		assert_eq!(response.session.state, OrderState::Completed);
		assert!(flow.view(&id).await.is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn test_cleanup_task_evicts_idle_sessions() {
		let mut config = test_config();
		config.storage.cleanup_interval_seconds = 60;
		config.flow.session_idle_timeout_seconds = 120;
		let flow = OrderFlow::new(
			config,
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			Arc::new(SubmitService::new(Box::new(MockSubmitter::accepting()))),
		);
		let idle = flow.create_session(None).await.session_id;
		let active = flow.create_session(Some("u1".into())).await.session_id;
		let cleanup = flow.spawn_cleanup();

		for _ in 0..4 {
			tokio::time::sleep(Duration::from_secs(50)).await;
			flow.view(&active).await.unwrap();
		}

		assert!(matches!(flow.view(&idle).await, Err(SessionError::NotFound(_))));
		assert_eq!(flow.sessions().len().await, 1);
		cleanup.abort();
	}

	struct FailingStorage;

	#[async_trait]
	impl StorageInterface for FailingStorage {
		async fn get_bytes(&self, _key: &str) -> Result<Vec<u8>, StorageError> {
			Err(StorageError::NotFound)
		}

		async fn set_bytes(
			&self,
			_key: &str,
			_value: Vec<u8>,
			_ttl: Option<Duration>,
		) -> Result<(), StorageError> {
			Err(StorageError::Backend("disk full".into()))
		}

		async fn delete(&self, _key: &str) -> Result<(), StorageError> {
			Ok(())
		}

		async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
			Ok(false)
		}

		fn config_schema(&self) -> Box<dyn order_types::ConfigSchema> {
			Box::new(order_storage::implementations::memory::MemoryStorageSchema)
		}
	}

	#[tokio::test]
	async fn test_cart_write_failure_reported_as_event() {
		let flow = OrderFlow::new(
			test_config(),
			Arc::new(StorageService::new(Box::new(FailingStorage))),
			Arc::new(SubmitService::new(Box::new(MockSubmitter::accepting()))),
		);
		let id = configured_session(&flow, Some("u1")).await;

		let response = flow.apply(&id, SessionAction::AddToCart).await.unwrap();

		assert_eq!(response.session.state, OrderState::Idle);
		assert_eq!(
			response.events.last(),
			Some(&OrderEvent::failed("Could not update your cart. Please try again."))
		);
		assert!(flow
			.storage()
			.retrieve_optional::<Cart>(StorageKey::Carts, "user:u1")
			.await
			.unwrap()
			.is_none());
	}
}
