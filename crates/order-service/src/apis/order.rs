//! Confirmed order lookup.

use crate::apis::api_error;
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	response::Json,
};
use order_types::{APIError, OrderRecord};

/// Handles GET /api/orders/{id}.
///
/// Only orders placed through this service are known.
pub async fn get_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<OrderRecord>, APIError> {
	match state.flow.get_order(&id).await.map_err(api_error)? {
		Some(record) => Ok(Json(record)),
		None => {
			tracing::debug!(order_id = %id, "Order not found");
			Err(APIError::NotFound {
				error_type: "ORDER_NOT_FOUND".to_string(),
				message: format!("Order {} not found", id),
			})
		}
	}
}
