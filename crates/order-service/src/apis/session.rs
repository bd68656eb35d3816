//! Order session endpoints.
//!
//! A session wraps one order context. Clients create a session, forward UI
//! actions to it and render the returned view and events.

use super::api_error;
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::Json,
};
use order_core::SessionAction;
use order_types::{
	APIError, ActionResponse, CreateSessionRequest, SelectFoodRequest, SelectPickupRequest,
	SessionView, SetUserRequest, UpdateQuantityRequest,
};

type ActionResult = Result<Json<ActionResponse>, APIError>;

async fn apply(state: &AppState, id: &str, action: SessionAction) -> ActionResult {
	state
		.flow
		.apply(id, action)
		.await
		.map(Json)
		.map_err(api_error)
}

/// Handles POST /api/sessions.
pub async fn create_session(
	State(state): State<AppState>,
	Json(request): Json<CreateSessionRequest>,
) -> (StatusCode, Json<SessionView>) {
	let view = state.flow.create_session(request.user_id).await;
	(StatusCode::CREATED, Json(view))
}

/// Handles GET /api/sessions/{id}.
pub async fn get_session(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<SessionView>, APIError> {
	state.flow.view(&id).await.map(Json).map_err(api_error)
}

/// Handles DELETE /api/sessions/{id}.
pub async fn close_session(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<StatusCode, APIError> {
	state.flow.close_session(&id).await.map_err(api_error)?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles POST /api/sessions/{id}/user.
pub async fn set_user(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<SetUserRequest>,
) -> ActionResult {
	if request.user_id.trim().is_empty() {
		return Err(APIError::BadRequest {
			error_type: "INVALID_USER".to_string(),
			message: "userId cannot be empty".to_string(),
		});
	}
	apply(
		&state,
		&id,
		SessionAction::SetUser {
			user_id: request.user_id,
		},
	)
	.await
}

/// Handles POST /api/sessions/{id}/select.
pub async fn select_food(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<SelectFoodRequest>,
) -> ActionResult {
	apply(&state, &id, SessionAction::SelectFood { item: request.item }).await
}

/// Handles POST /api/sessions/{id}/quantity.
pub async fn update_quantity(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<UpdateQuantityRequest>,
) -> ActionResult {
	apply(
		&state,
		&id,
		SessionAction::UpdateQuantity {
			quantity: request.quantity,
		},
	)
	.await
}

/// Handles POST /api/sessions/{id}/pickup.
pub async fn select_pickup_point(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<SelectPickupRequest>,
) -> ActionResult {
	apply(
		&state,
		&id,
		SessionAction::SelectPickupPoint {
			pickup_point: request.pickup_point,
		},
	)
	.await
}

/// Handles POST /api/sessions/{id}/cart.
pub async fn add_to_cart(Path(id): Path<String>, State(state): State<AppState>) -> ActionResult {
	apply(&state, &id, SessionAction::AddToCart).await
}

/// Handles POST /api/sessions/{id}/close.
pub async fn close_modal(Path(id): Path<String>, State(state): State<AppState>) -> ActionResult {
	apply(&state, &id, SessionAction::CloseModal).await
}

/// Handles POST /api/sessions/{id}/order.
///
/// Responds once the order API has answered. The outcome is reported through
/// the events, not the status code.
pub async fn place_order(Path(id): Path<String>, State(state): State<AppState>) -> ActionResult {
	state
		.flow
		.place_order(&id)
		.await
		.map(Json)
		.map_err(api_error)
}
