//! Order context: the draft of one order and the state governing it.
//!
//! Transitions:
//!
//! ```text
//! Idle --select_food--> Configuring --place_order--> Processing --ok--> Completed
//!  ^                      |   ^                          |                 |
//!  |   add_to_cart /      |   +--------- failure --------+                 |
//!  +--- close_modal ------+                                                |
//!  +------------------- close_modal / select_food (re-dispatched) ---------+
//! ```
//!
//! Every action is defined in every state. Actions that do not apply to the
//! current state are no-ops, so callers never need to check the state before
//! forwarding a UI event.

use order_config::DEFAULT_SUBMIT_ERROR_MESSAGE;
use order_submit::{SubmitError, SubmitService};
use order_types::{
	Item, OrderConfirmation, OrderDraft, OrderEvent, OrderPayload, OrderState,
	DEFAULT_PICKUP_POINT,
};
use thiserror::Error;

const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to place an order";
const INVALID_ITEM_MESSAGE: &str = "Invalid item or price";

/// Treats empty and whitespace-only ids as absent.
fn non_blank(value: Option<&str>) -> Option<&str> {
	value.filter(|v| !v.trim().is_empty())
}

/// Preconditions of building an order payload.
///
/// These indicate a caller that let an incomplete draft reach submission. They
/// never escape the context: placement converts them into a failure event.
#[derive(Debug, Error, PartialEq)]
pub enum FlowError {
	#[error("No item selected")]
	MissingSelection,
	#[error("User is not logged in")]
	MissingUser,
	#[error("Item {0} has no vendor")]
	MissingVendor(String),
}

/// Outcome of the first half of placing an order.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderAttempt {
	/// The context moved to Processing; the payload must be submitted and the
	/// result handed to [`OrderContext::finish_order`].
	Submit(OrderPayload),
	/// The order cannot be placed; the context did not move to Processing.
	Rejected(Vec<OrderEvent>),
	/// The current state does not place orders.
	Ignored,
}

/// The order flow for one ordering session.
#[derive(Debug, Clone)]
pub struct OrderContext {
	state: OrderState,
	draft: OrderDraft,
	submit_error_message: String,
}

impl Default for OrderContext {
	fn default() -> Self {
		Self::new(DEFAULT_PICKUP_POINT)
	}
}

impl OrderContext {
	/// Creates a context in Idle with an empty draft.
	pub fn new(default_pickup_point: impl Into<String>) -> Self {
		Self {
			state: OrderState::Idle,
			draft: OrderDraft::new(default_pickup_point),
			submit_error_message: DEFAULT_SUBMIT_ERROR_MESSAGE.to_string(),
		}
	}

	/// Sets the message reported when a submission fails without one.
	pub fn with_submit_error_message(mut self, message: impl Into<String>) -> Self {
		self.submit_error_message = message.into();
		self
	}

	pub fn state(&self) -> OrderState {
		self.state
	}

	pub fn draft(&self) -> &OrderDraft {
		&self.draft
	}

	pub fn selected_item(&self) -> Option<&Item> {
		self.draft.selected_item.as_ref()
	}

	pub fn quantity(&self) -> u32 {
		self.draft.quantity()
	}

	pub fn pickup_point(&self) -> &str {
		&self.draft.pickup_point
	}

	pub fn user_id(&self) -> Option<&str> {
		self.draft.user_id.as_deref()
	}

	pub fn is_modal_open(&self) -> bool {
		self.draft.modal_open
	}

	pub fn total_price(&self) -> f64 {
		self.draft.total_price()
	}

	pub fn can_modify_order(&self) -> bool {
		self.state.can_modify_order()
	}

	pub fn can_place_order(&self) -> bool {
		self.state.can_place_order()
	}

	/// Records the user of this session. A blank id logs the user out.
	pub fn set_user_id(&mut self, user_id: impl Into<String>) {
		let user_id = user_id.into();
		if user_id.trim().is_empty() {
			if self.draft.user_id.take().is_some() {
				tracing::debug!("Clearing session user");
			}
			return;
		}
		if let Some(previous) = self.draft.user_id.as_deref().filter(|p| *p != user_id) {
			tracing::debug!(previous, user_id = %user_id, "Replacing session user");
		}
		self.draft.user_id = Some(user_id);
	}

	/// Clears the selection and quantity and hides the modal flag.
	///
	/// Produces no event; see [`close_modal`](Self::close_modal) for a close
	/// the UI is told about.
	pub fn reset(&mut self) {
		self.draft.reset();
	}

	fn transition_to(&mut self, next: OrderState) {
		if self.state != next {
			tracing::info!(from = %self.state, to = %next, "Order state transition");
			self.state = next;
		}
	}

	fn set_modal_open(&mut self, open: bool, events: &mut Vec<OrderEvent>) {
		self.draft.modal_open = open;
		events.push(OrderEvent::ModalChanged { open });
	}

	/// Closes the modal, resets the draft and returns to Idle.
	fn close_and_reset(&mut self, events: &mut Vec<OrderEvent>) {
		self.set_modal_open(false, events);
		self.reset();
		self.transition_to(OrderState::Idle);
	}

	fn ignore(&self, action: &str) {
		tracing::debug!(state = %self.state, action, "Action ignored in current state");
	}

	/// Selects an item to order.
	///
	/// From Completed the previous order is closed first and the selection is
	/// then handled as from Idle, so a new order starts for the item.
	pub fn select_food(&mut self, item: Item) -> Vec<OrderEvent> {
		let mut events = Vec::new();

		if self.state == OrderState::Completed {
			self.close_and_reset(&mut events);
		}

		match self.state {
			OrderState::Idle | OrderState::Configuring => {
				if !item.available {
					tracing::warn!(item_id = %item.id, "Unavailable item selected");
					events.push(OrderEvent::failed(format!(
						"{} is currently unavailable",
						item.display_name()
					)));
					return events;
				}

				tracing::info!(item_id = %item.id, price = item.unit_price, "Item selected");
				self.draft.selected_item = Some(item);
				self.draft.set_quantity(1);
				if self.state == OrderState::Idle {
					self.set_modal_open(true, &mut events);
					self.transition_to(OrderState::Configuring);
				}
			}
			OrderState::Processing | OrderState::Completed => self.ignore("select_food"),
		}

		events
	}

	/// Sets the quantity. Values below one are raised to one.
	pub fn update_quantity(&mut self, quantity: i64) -> Vec<OrderEvent> {
		match self.state {
			OrderState::Configuring => self.draft.set_quantity(quantity),
			_ => self.ignore("update_quantity"),
		}
		Vec::new()
	}

	pub fn select_pickup_point(&mut self, pickup_point: impl Into<String>) -> Vec<OrderEvent> {
		match self.state {
			OrderState::Configuring => self.draft.pickup_point = pickup_point.into(),
			_ => self.ignore("select_pickup_point"),
		}
		Vec::new()
	}

	/// Hands the configured item to the cart and starts over.
	pub fn add_to_cart(&mut self) -> Vec<OrderEvent> {
		let mut events = Vec::new();

		match (self.state, self.draft.selected_item.clone()) {
			(OrderState::Configuring, Some(item)) => {
				let quantity = self.draft.quantity();
				tracing::info!(item_id = %item.id, quantity, "Item added to cart");
				events.push(OrderEvent::AddedToCart { item, quantity });
				self.close_and_reset(&mut events);
			}
			_ => self.ignore("add_to_cart"),
		}

		events
	}

	pub fn close_modal(&mut self) -> Vec<OrderEvent> {
		let mut events = Vec::new();

		match self.state {
			OrderState::Configuring | OrderState::Completed => self.close_and_reset(&mut events),
			// An order in flight cannot be dismissed.
			OrderState::Processing | OrderState::Idle => self.ignore("close_modal"),
		}

		events
	}

	/// Builds the submission payload from the draft.
	pub fn submit_payload(&self) -> Result<OrderPayload, FlowError> {
		let item = self
			.draft
			.selected_item
			.as_ref()
			.ok_or(FlowError::MissingSelection)?;
		let user_id = non_blank(self.draft.user_id.as_deref()).ok_or(FlowError::MissingUser)?;
		let vendor_id = non_blank(item.vendor_id.as_deref())
			.ok_or_else(|| FlowError::MissingVendor(item.id.clone()))?;

		Ok(OrderPayload {
			user_id: user_id.to_string(),
			vendor_id: vendor_id.to_string(),
			item_id: item.id.clone(),
			quantity: self.draft.quantity(),
			unit_price: item.unit_price,
			pickup_point: self.draft.pickup_point.clone(),
		})
	}

	/// Validates the draft and, if it can be ordered, moves to Processing.
	pub fn begin_order(&mut self) -> OrderAttempt {
		if self.state != OrderState::Configuring {
			self.ignore("place_order");
			return OrderAttempt::Ignored;
		}

		if non_blank(self.draft.user_id.as_deref()).is_none() {
			tracing::warn!("Order attempted without a user");
			return OrderAttempt::Rejected(vec![OrderEvent::failed(LOGIN_REQUIRED_MESSAGE)]);
		}
		if !self.selected_item().is_some_and(Item::has_price) {
			tracing::warn!("Order attempted without a priced item");
			return OrderAttempt::Rejected(vec![OrderEvent::failed(INVALID_ITEM_MESSAGE)]);
		}

		self.transition_to(OrderState::Processing);
		match self.submit_payload() {
			Ok(payload) => OrderAttempt::Submit(payload),
			Err(e) => {
				tracing::warn!(error = %e, "Order payload incomplete");
				self.transition_to(OrderState::Configuring);
				OrderAttempt::Rejected(vec![OrderEvent::failed(e.to_string())])
			}
		}
	}

	/// Applies the result of a submission started by [`begin_order`](Self::begin_order).
	///
	/// Only a context still in Processing is affected; a late result for a
	/// context that has moved on is dropped.
	pub fn finish_order(
		&mut self,
		outcome: Result<OrderConfirmation, SubmitError>,
	) -> Vec<OrderEvent> {
		if self.state != OrderState::Processing {
			tracing::debug!(state = %self.state, "Dropping submission result");
			return Vec::new();
		}

		match outcome {
			Ok(confirmation) => {
				self.transition_to(OrderState::Completed);
				vec![OrderEvent::Succeeded { confirmation }]
			}
			Err(e) => {
				self.transition_to(OrderState::Configuring);
				let message = e.user_message();
				let message = if message.trim().is_empty() {
					self.submit_error_message.clone()
				} else {
					message
				};
				vec![OrderEvent::Failed { message }]
			}
		}
	}

	/// Places the configured order through `submit`.
	///
	/// The context stays in Processing for the duration of the submission.
	pub async fn place_order(&mut self, submit: &SubmitService) -> Vec<OrderEvent> {
		match self.begin_order() {
			OrderAttempt::Submit(payload) => {
				let outcome = submit.submit(&payload).await;
				self.finish_order(outcome)
			}
			OrderAttempt::Rejected(events) => events,
			OrderAttempt::Ignored => Vec::new(),
		}
	}
}
