//! Order flow states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of states an order context can be in.
///
/// The state decides which actions have an effect. Every action is defined in
/// every state; actions that make no sense in a state are no-ops there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
	/// Nothing selected, modal closed.
	#[default]
	Idle,
	/// An item is selected and the user is adjusting quantity and pickup.
	Configuring,
	/// An order submission is in flight.
	Processing,
	/// The last submission succeeded.
	Completed,
}

impl OrderState {
	/// Whether the draft can be edited in this state.
	pub fn can_modify_order(&self) -> bool {
		matches!(self, OrderState::Configuring)
	}

	/// Whether an order can be placed from this state.
	pub fn can_place_order(&self) -> bool {
		matches!(self, OrderState::Configuring)
	}

	/// Whether this state requires a selected item.
	pub fn has_selection(&self) -> bool {
		!matches!(self, OrderState::Idle)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			OrderState::Idle => "idle",
			OrderState::Configuring => "configuring",
			OrderState::Processing => "processing",
			OrderState::Completed => "completed",
		}
	}
}

impl fmt::Display for OrderState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
