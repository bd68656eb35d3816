//! API types for the order session endpoints.
//!
//! These shapes are what the HTTP layer exchanges with the storefront UI. They
//! are kept here so that the core can build views without depending on the
//! web stack.

use crate::{Cart, Item, OrderDraft, OrderEvent, OrderState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body for `POST /api/sessions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
	#[serde(default)]
	pub user_id: Option<String>,
}

/// Request body for `POST /api/sessions/{id}/user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserRequest {
	pub user_id: String,
}

/// Request body for `POST /api/sessions/{id}/select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectFoodRequest {
	pub item: Item,
}

/// Request body for `POST /api/sessions/{id}/quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
	pub quantity: i64,
}

/// Request body for `POST /api/sessions/{id}/pickup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectPickupRequest {
	pub pickup_point: String,
}

/// Snapshot of one order session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
	pub session_id: String,
	pub state: OrderState,
	pub draft: OrderDraft,
	pub total_price: f64,
	pub can_modify_order: bool,
	pub can_place_order: bool,
}

/// Response to any session action: the new snapshot and what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
	pub session: SessionView,
	pub events: Vec<OrderEvent>,
}

/// Response for `GET /api/carts/{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
	pub user_id: String,
	pub cart: Cart,
	pub total: f64,
}

/// Response for `GET /api/sessions/{id}/cart`: the cart the session adds to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCartResponse {
	pub session_id: String,
	/// Set when the cart belongs to the session's user rather than the session.
	pub user_id: Option<String>,
	pub cart: Cart,
	pub total: f64,
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine readable error code.
	pub error: String,
	/// Human readable description.
	pub message: String,
}

/// API errors with their HTTP semantics.
#[derive(Debug, Clone)]
pub enum APIError {
	/// 400
	BadRequest { error_type: String, message: String },
	/// 404
	NotFound { error_type: String, message: String },
	/// 503
	ServiceUnavailable { error_type: String, message: String },
	/// 500
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::NotFound { .. } => 404,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::ServiceUnavailable {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
