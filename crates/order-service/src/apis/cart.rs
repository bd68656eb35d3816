//! Cart endpoints.

use super::api_error;
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::Json,
};
use order_core::CartOwner;
use order_types::{APIError, Cart, CartResponse, SessionCartResponse};

fn cart_response(user_id: String, cart: Cart) -> Json<CartResponse> {
	Json(CartResponse {
		total: cart.total(),
		user_id,
		cart,
	})
}

/// Handles GET /api/carts/{user_id}.
pub async fn get_cart(
	Path(user_id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<CartResponse>, APIError> {
	let cart = state
		.flow
		.get_cart(&CartOwner::User(user_id.clone()))
		.await
		.map_err(api_error)?;
	Ok(cart_response(user_id, cart))
}

/// Handles DELETE /api/carts/{user_id}/items/{item_id}.
pub async fn remove_cart_item(
	Path((user_id, item_id)): Path<(String, String)>,
	State(state): State<AppState>,
) -> Result<Json<CartResponse>, APIError> {
	let cart = state
		.flow
		.remove_cart_item(&CartOwner::User(user_id.clone()), &item_id)
		.await
		.map_err(api_error)?;
	Ok(cart_response(user_id, cart))
}

/// Handles DELETE /api/carts/{user_id}.
pub async fn clear_cart(
	Path(user_id): Path<String>,
	State(state): State<AppState>,
) -> Result<StatusCode, APIError> {
	state
		.flow
		.clear_cart(&CartOwner::User(user_id))
		.await
		.map_err(api_error)?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles GET /api/sessions/{id}/cart.
pub async fn get_session_cart(
	Path(session_id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<SessionCartResponse>, APIError> {
	let (owner, cart) = state
		.flow
		.session_cart(&session_id)
		.await
		.map_err(api_error)?;
	let user_id = match owner {
		CartOwner::User(user_id) => Some(user_id),
		CartOwner::Session(_) => None,
	};
	Ok(Json(SessionCartResponse {
		session_id,
		user_id,
		total: cart.total(),
		cart,
	}))
}
