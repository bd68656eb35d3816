//! Scripted order submitter.
//!
//! Accepts every order, or rejects every order with a fixed message, and keeps
//! the payloads it saw. Used for local runs without an order API and in tests.

use crate::{OrderSubmitInterface, SubmitError, SubmitFactory, SubmitRegistry};
use async_trait::async_trait;
use order_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, OrderConfirmation, OrderPayload,
	Schema, ValidationError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct MockSubmitter {
	/// When set, every submission is rejected with this message.
	fail_with: Option<String>,
	/// Checkout URL prefix returned with confirmations.
	checkout_base: Option<String>,
	/// Simulated API latency.
	delay: Duration,
	submitted: Arc<Mutex<Vec<OrderPayload>>>,
}

impl MockSubmitter {
	pub fn accepting() -> Self {
		Self::default()
	}

	pub fn rejecting(message: impl Into<String>) -> Self {
		Self {
			fail_with: Some(message.into()),
			..Self::default()
		}
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}

	pub fn with_checkout_base(mut self, base: impl Into<String>) -> Self {
		self.checkout_base = Some(base.into());
		self
	}

	/// Payloads received so far, in order.
	pub async fn submitted(&self) -> Vec<OrderPayload> {
		self.submitted.lock().await.clone()
	}
}

#[async_trait]
impl OrderSubmitInterface for MockSubmitter {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockSubmitterSchema)
	}

	async fn submit(&self, payload: &OrderPayload) -> Result<OrderConfirmation, SubmitError> {
		if !self.delay.is_zero() {
			tokio::time::sleep(self.delay).await;
		}

		let count = {
			let mut submitted = self.submitted.lock().await;
			submitted.push(payload.clone());
			submitted.len()
		};

		if let Some(message) = &self.fail_with {
			return Err(SubmitError::Rejected(message.clone()));
		}

		let order_id = format!("mock-{}", count);
		Ok(OrderConfirmation {
			checkout_url: self
				.checkout_base
				.as_ref()
				.map(|base| format!("{}/{}", base.trim_end_matches('/'), order_id)),
			order_id,
		})
	}
}

pub struct MockSubmitterSchema;

impl ConfigSchema for MockSubmitterSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![
				Field::new("fail_with", FieldType::String),
				Field::new("checkout_base_url", FieldType::String),
				Field::new(
					"delay_ms",
					FieldType::Integer {
						min: Some(0),
						max: Some(60_000),
					},
				),
			],
		)
		.validate(config)
	}
}

/// Builds a mock submitter.
///
/// Configuration:
/// - `fail_with`: reject every order with this message
/// - `checkout_base_url`: return `{checkout_base_url}/{order_id}` as checkout URL
/// - `delay_ms`: simulated latency
pub fn create_submitter(
	config: &toml::Value,
) -> Result<Box<dyn OrderSubmitInterface>, SubmitError> {
	MockSubmitterSchema
		.validate(config)
		.map_err(|e| SubmitError::Configuration(e.to_string()))?;

	let mut submitter = match config.get("fail_with").and_then(|v| v.as_str()) {
		Some(message) => MockSubmitter::rejecting(message),
		None => MockSubmitter::accepting(),
	};
	if let Some(base) = config.get("checkout_base_url").and_then(|v| v.as_str()) {
		submitter = submitter.with_checkout_base(base);
	}
	if let Some(delay_ms) = config.get("delay_ms").and_then(|v| v.as_integer()) {
		submitter = submitter.with_delay(Duration::from_millis(delay_ms as u64));
	}

	Ok(Box::new(submitter))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = SubmitFactory;

	fn factory() -> Self::Factory {
		create_submitter
	}
}

impl SubmitRegistry for Registry {}
