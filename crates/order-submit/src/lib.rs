//! Order submission for the campus order flow.
//!
//! Placing an order ends in a call to the remote order API. The order flow only
//! knows the [`SubmitService`]; which implementation sits behind it (the real
//! HTTP API or a scripted mock) is chosen by configuration.

use async_trait::async_trait;
use order_types::{
	truncate_id, ConfigSchema, ImplementationRegistry, OrderConfirmation, OrderPayload,
};
use thiserror::Error;
use tracing::instrument;

pub mod implementations {
	pub mod http;
	pub mod mock;
}

#[derive(Debug, Error)]
pub enum SubmitError {
	/// The request never got a response.
	#[error("Network error: {0}")]
	Network(String),
	/// The order API answered and refused the order.
	#[error("{0}")]
	Rejected(String),
	/// The order API answered with something that is not a confirmation.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl SubmitError {
	/// The message to show the user.
	///
	/// Rejections carry the API's own wording; other failures keep their
	/// description. Empty messages are returned as empty so the caller can
	/// substitute its fallback.
	pub fn user_message(&self) -> String {
		match self {
			SubmitError::Rejected(message) => message.clone(),
			other => other.to_string(),
		}
	}
}

/// Interface of an order submitter.
#[async_trait]
pub trait OrderSubmitInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Submits one order and returns the API's confirmation.
	async fn submit(&self, payload: &OrderPayload) -> Result<OrderConfirmation, SubmitError>;
}

pub type SubmitFactory = fn(&toml::Value) -> Result<Box<dyn OrderSubmitInterface>, SubmitError>;

pub trait SubmitRegistry: ImplementationRegistry<Factory = SubmitFactory> {}

/// All built-in submitters as (config name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, SubmitFactory)> {
	use implementations::{http, mock};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}

/// Submits orders through the configured implementation.
pub struct SubmitService {
	implementation: Box<dyn OrderSubmitInterface>,
}

impl SubmitService {
	pub fn new(implementation: Box<dyn OrderSubmitInterface>) -> Self {
		Self { implementation }
	}

	#[instrument(skip_all, fields(user = %truncate_id(&payload.user_id), item = %payload.item_id))]
	pub async fn submit(&self, payload: &OrderPayload) -> Result<OrderConfirmation, SubmitError> {
		tracing::debug!(
			vendor = %payload.vendor_id,
			quantity = payload.quantity,
			total = payload.total_price(),
			"Submitting order"
		);

		match self.implementation.submit(payload).await {
			Ok(confirmation) => {
				tracing::info!(order_id = %confirmation.order_id, "Order accepted");
				Ok(confirmation)
			},
			Err(e) => {
				tracing::warn!(error = %e, "Order submission failed");
				Err(e)
			},
		}
	}
}
