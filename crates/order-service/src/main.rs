//! Main entry point for the order flow service.
//!
//! Loads the configuration, builds the order flow with the configured storage
//! and submission backends, and serves the session API until interrupted.

use clap::Parser;
use order_config::Config;
use order_core::{OrderFlow, OrderFlowBuilder, OrderFlowFactories};
use std::path::PathBuf;

mod apis;
mod server;

use order_storage::implementations::file::create_storage as create_file_storage;
use order_storage::implementations::memory::create_storage as create_memory_storage;
use order_submit::implementations::http::create_submitter as create_http_submitter;
use order_submit::implementations::mock::create_submitter as create_mock_submitter;

/// Command-line arguments for the order flow service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "ORDER_FLOW_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started order flow");

	let config = Config::from_file(&args.config).await?;
	tracing::info!(
		storage = %config.storage.primary,
		submission = %config.submission.primary,
		"Loaded configuration"
	);

	let flow = build_flow(config.clone())?;
	let cleanup = flow.spawn_cleanup();

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			tokio::select! {
				result = server::start_server(api_config, flow) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutdown requested");
				}
			}
		}
		None => {
			tracing::warn!("API disabled, nothing to serve until interrupted");
			tokio::signal::ctrl_c().await?;
		}
	}

	cleanup.abort();
	tracing::info!("Stopped order flow");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the order flow with every built-in storage and submission backend.
fn build_flow(config: Config) -> Result<OrderFlow, Box<dyn std::error::Error>> {
	let storage_factories = create_factory_map!(
		order_storage::StorageInterface,
		order_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let submit_factories = create_factory_map!(
		order_submit::OrderSubmitInterface,
		order_submit::SubmitError,
		"http" => create_http_submitter,
		"mock" => create_mock_submitter,
	);

	let factories = OrderFlowFactories {
		storage_factories,
		submit_factories,
	};

	Ok(OrderFlowBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_build_flow_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let storage_path = dir.path().join("storage");
		let config_path = dir.path().join("config.toml");
		std::fs::write(
			&config_path,
			format!(
				r#"
[flow]
default_pickup_point = "Science Park"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{}"
[storage.implementations.memory]

[submission]
primary = "mock"
[submission.implementations.mock]
checkout_base_url = "https://pay.test"
"#,
				storage_path.display()
			),
		)
		.unwrap();

		let config = Config::from_file(&config_path).await.unwrap();
		let flow = build_flow(config).unwrap();

		let view = flow.create_session(Some("u1".into())).await;
		assert_eq!(view.draft.pickup_point, "Science Park");
		assert!(flow
			.get_cart(&order_core::CartOwner::User("u1".into()))
			.await
			.unwrap()
			.is_empty());
	}

	#[test]
	fn test_unknown_primary_fails() {
		let mut config = order_config::test_config();
		config.storage.primary = "redis".into();
		config
			.storage
			.implementations
			.insert("redis".into(), toml::Value::Table(toml::map::Map::new()));

		assert!(build_flow(config).is_err());
	}
}
