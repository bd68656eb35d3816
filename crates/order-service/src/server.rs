//! HTTP server for the order session API.

use crate::apis;
use axum::{
	extract::DefaultBodyLimit,
	http::HeaderValue,
	routing::{delete, get, post},
	Router,
};
use order_config::ApiConfig;
use order_core::OrderFlow;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub flow: OrderFlow,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
	if allowed_origins.is_empty() {
		return CorsLayer::permissive();
	}

	let origins: Vec<HeaderValue> = allowed_origins
		.iter()
		.filter_map(|origin| match origin.parse() {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
				None
			}
		})
		.collect();

	CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_methods(Any)
		.allow_headers(Any)
}

/// Builds the `/api` router.
pub fn router(api_config: &ApiConfig, state: AppState) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/sessions", post(apis::session::create_session))
				.route(
					"/sessions/{id}",
					get(apis::session::get_session).delete(apis::session::close_session),
				)
				.route("/sessions/{id}/user", post(apis::session::set_user))
				.route("/sessions/{id}/select", post(apis::session::select_food))
				.route("/sessions/{id}/quantity", post(apis::session::update_quantity))
				.route("/sessions/{id}/pickup", post(apis::session::select_pickup_point))
				.route(
					"/sessions/{id}/cart",
					get(apis::cart::get_session_cart).post(apis::session::add_to_cart),
				)
				.route("/sessions/{id}/order", post(apis::session::place_order))
				.route("/sessions/{id}/close", post(apis::session::close_modal))
				.route(
					"/carts/{user_id}",
					get(apis::cart::get_cart).delete(apis::cart::clear_cart),
				)
				.route(
					"/carts/{user_id}/items/{item_id}",
					delete(apis::cart::remove_cart_item),
				)
				.route("/orders/{id}", get(apis::order::get_order)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(DefaultBodyLimit::max(api_config.max_request_size))
				.layer(cors_layer(&api_config.allowed_origins)),
		)
		.with_state(state)
}

/// Serves the API until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	flow: OrderFlow,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(&api_config, AppState { flow });

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Order flow API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}
