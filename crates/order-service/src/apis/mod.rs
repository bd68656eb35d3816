//! Handlers for the `/api` routes.

pub mod cart;
pub mod order;
pub mod session;

use order_core::{CartError, SessionError};
use order_types::APIError;

/// Maps an engine error onto its API error.
pub(crate) fn api_error(e: SessionError) -> APIError {
	match e {
		SessionError::NotFound(id) => APIError::NotFound {
			error_type: "SESSION_NOT_FOUND".to_string(),
			message: format!("Session {} not found", id),
		},
		SessionError::Cart(CartError::ItemNotFound(item_id)) => APIError::NotFound {
			error_type: "CART_ITEM_NOT_FOUND".to_string(),
			message: format!("Item {} is not in the cart", item_id),
		},
		SessionError::Cart(e) => {
			tracing::warn!(error = %e, "Cart request failed");
			APIError::ServiceUnavailable {
				error_type: "CART_UNAVAILABLE".to_string(),
				message: e.to_string(),
			}
		}
		SessionError::Storage(e) => {
			tracing::error!(error = %e, "Storage request failed");
			APIError::InternalServerError {
				error_type: "STORAGE_ERROR".to_string(),
				message: "Failed to access storage".to_string(),
			}
		}
	}
}
