//! Order submitter backed by the remote order API.
//!
//! Orders are POSTed as JSON to `{base_url}/orders`. A 2xx answer must carry an
//! [`OrderConfirmation`]; any other status is a rejection whose message is the
//! `message` (or `error`) field of the body when the API sends one.

use crate::{OrderSubmitInterface, SubmitError, SubmitFactory, SubmitRegistry};
use async_trait::async_trait;
use order_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, OrderConfirmation, OrderPayload,
	Schema, ValidationError,
};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

pub struct HttpSubmitter {
	client: reqwest::Client,
	orders_url: String,
	auth_token: Option<String>,
}

impl HttpSubmitter {
	pub fn new(
		base_url: &str,
		auth_token: Option<String>,
		timeout: Duration,
	) -> Result<Self, SubmitError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.pool_idle_timeout(Duration::from_secs(90))
			.build()
			.map_err(|e| SubmitError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			orders_url: orders_url(base_url),
			auth_token,
		})
	}
}

fn orders_url(base_url: &str) -> String {
	format!("{}/orders", base_url.trim_end_matches('/'))
}

/// Pulls a human readable message out of an error body.
fn rejection_message(status: reqwest::StatusCode, body: &str) -> String {
	serde_json::from_str::<serde_json::Value>(body)
		.ok()
		.and_then(|value| {
			["message", "error"]
				.iter()
				.find_map(|field| value.get(field).and_then(|v| v.as_str()).map(str::to_string))
		})
		.filter(|message| !message.trim().is_empty())
		.unwrap_or_else(|| {
			format!(
				"Order API returned {}",
				status.canonical_reason().unwrap_or(status.as_str())
			)
		})
}

#[async_trait]
impl OrderSubmitInterface for HttpSubmitter {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpSubmitterSchema)
	}

	async fn submit(&self, payload: &OrderPayload) -> Result<OrderConfirmation, SubmitError> {
		let mut request = self.client.post(&self.orders_url).json(payload);
		if let Some(token) = &self.auth_token {
			request = request.bearer_auth(token);
		}

		let response = request
			.send()
			.await
			.map_err(|e| SubmitError::Network(e.to_string()))?;
		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| SubmitError::Network(e.to_string()))?;

		if !status.is_success() {
			tracing::debug!(status = %status, body = %body, "Order API refused order");
			return Err(SubmitError::Rejected(rejection_message(status, &body)));
		}

		serde_json::from_str(&body).map_err(|e| SubmitError::InvalidResponse(e.to_string()))
	}
}

pub struct HttpSubmitterSchema;

impl ConfigSchema for HttpSubmitterSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("base_url", FieldType::String).with_validator(|value| {
				let url = value.as_str().unwrap_or_default();
				if url.starts_with("http://") || url.starts_with("https://") {
					Ok(())
				} else {
					Err(format!("'{}' is not an http(s) URL", url))
				}
			})],
			vec![
				Field::new("auth_token", FieldType::String),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		)
		.validate(config)
	}
}

/// Builds an HTTP submitter.
///
/// Configuration:
/// - `base_url` (required): root of the order API, e.g. "https://api.example/api"
/// - `auth_token`: bearer token sent with every request
/// - `timeout_seconds`: request timeout (default: 15)
pub fn create_submitter(
	config: &toml::Value,
) -> Result<Box<dyn OrderSubmitInterface>, SubmitError> {
	HttpSubmitterSchema
		.validate(config)
		.map_err(|e| SubmitError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| SubmitError::Configuration("base_url is required".into()))?;
	let auth_token = config
		.get("auth_token")
		.and_then(|v| v.as_str())
		.filter(|token| !token.is_empty())
		.map(str::to_string);
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| secs as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(HttpSubmitter::new(
		base_url,
		auth_token,
		Duration::from_secs(timeout),
	)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = SubmitFactory;

	fn factory() -> Self::Factory {
		create_submitter
	}
}

impl SubmitRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
	use serde_json::json;

	fn payload(quantity: u32) -> OrderPayload {
		OrderPayload {
			user_id: "u1".into(),
			vendor_id: "v1".into(),
			item_id: "f1".into(),
			quantity,
			unit_price: 100.0,
			pickup_point: "Main Campus Cafeteria".into(),
		}
	}

	/// Order API stand-in: rejects quantities above 10, requires the bearer token.
	async fn handle_order(
		headers: HeaderMap,
		Json(payload): Json<OrderPayload>,
	) -> (StatusCode, Json<serde_json::Value>) {
		let authorized = headers
			.get("authorization")
			.and_then(|v| v.to_str().ok())
			== Some("Bearer secret");
		if !authorized {
			return (StatusCode::UNAUTHORIZED, Json(json!({})));
		}
		if payload.quantity > 10 {
			return (
				StatusCode::UNPROCESSABLE_ENTITY,
				Json(json!({ "message": "Quantity exceeds vendor limit" })),
			);
		}
		(
			StatusCode::CREATED,
			Json(json!({
				"orderId": format!("{}-{}", payload.item_id, payload.quantity),
				"checkoutUrl": "https://pay.example/session/1"
			})),
		)
	}

	async fn spawn_api() -> String {
		let app = Router::new().route("/api/orders", post(handle_order));
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}/api/", addr)
	}

	fn submitter(base_url: &str, token: Option<&str>) -> HttpSubmitter {
		HttpSubmitter::new(
			base_url,
			token.map(str::to_string),
			Duration::from_secs(5),
		)
		.unwrap()
	}

	#[test]
	fn test_orders_url() {
		assert_eq!(orders_url("http://h/api/"), "http://h/api/orders");
		assert_eq!(orders_url("http://h/api"), "http://h/api/orders");
	}

	#[test]
	fn test_rejection_message() {
		let status = reqwest::StatusCode::BAD_REQUEST;
		assert_eq!(rejection_message(status, r#"{"message":"Sold out"}"#), "Sold out");
		assert_eq!(rejection_message(status, r#"{"error":"Closed"}"#), "Closed");
		assert_eq!(
			rejection_message(status, "<html>"),
			"Order API returned Bad Request"
		);
	}

	#[tokio::test]
	async fn test_submit_accepted() {
		let base_url = spawn_api().await;

		let confirmation = submitter(&base_url, Some("secret"))
			.submit(&payload(2))
			.await
			.unwrap();

		assert_eq!(confirmation.order_id, "f1-2");
		assert_eq!(
			confirmation.checkout_url.as_deref(),
			Some("https://pay.example/session/1")
		);
	}

	#[tokio::test]
	async fn test_submit_rejected_with_api_message() {
		let base_url = spawn_api().await;

		let err = submitter(&base_url, Some("secret"))
			.submit(&payload(11))
			.await
			.unwrap_err();

		assert_eq!(err.user_message(), "Quantity exceeds vendor limit");
	}

	#[tokio::test]
	async fn test_submit_unauthorized() {
		let base_url = spawn_api().await;

		let err = submitter(&base_url, None)
			.submit(&payload(1))
			.await
			.unwrap_err();

		assert!(matches!(err, SubmitError::Rejected(ref m) if m == "Order API returned Unauthorized"));
	}

	#[tokio::test]
	async fn test_submit_network_error() {
		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);

		let err = submitter(&format!("http://{}", addr), None)
			.submit(&payload(1))
			.await
			.unwrap_err();

		assert!(matches!(err, SubmitError::Network(_)));
	}

	#[test]
	fn test_factory_validation() {
		let config: toml::Value = toml::from_str("timeout_seconds = 5").unwrap();
		assert!(matches!(
			create_submitter(&config),
			Err(SubmitError::Configuration(_))
		));

		let config: toml::Value = toml::from_str(r#"base_url = "localhost:8080""#).unwrap();
		assert!(matches!(
			create_submitter(&config),
			Err(SubmitError::Configuration(_))
		));

		let config: toml::Value =
			toml::from_str(r#"base_url = "https://orders.example/api""#).unwrap();
		assert!(create_submitter(&config).is_ok());
	}
}
