//! Builder for constructing an order flow from configuration.
//!
//! Each configured implementation is created through the factory registered
//! under its name; the `primary` one of each kind backs the flow.

use crate::engine::OrderFlow;
use order_config::Config;
use order_storage::{StorageError, StorageInterface, StorageService};
use order_submit::{OrderSubmitInterface, SubmitError, SubmitService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building an order flow.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for each pluggable component, keyed by implementation name.
pub struct OrderFlowFactories<SF, SUF> {
	pub storage_factories: HashMap<String, SF>,
	pub submit_factories: HashMap<String, SUF>,
}

pub struct OrderFlowBuilder {
	config: Config,
}

/// Creates every configured implementation that has a factory and returns
/// the primary one.
fn build_primary<T, E, F>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<T, BuilderError>
where
	E: Display,
	F: Fn(&toml::Value) -> Result<T, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = name == primary;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			}
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			}
		}
	}

	if loaded.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"No valid {} implementations available",
			component
		)));
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}

impl OrderFlowBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn build<SF, SUF>(
		self,
		factories: OrderFlowFactories<SF, SUF>,
	) -> Result<OrderFlow, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		SUF: Fn(&toml::Value) -> Result<Box<dyn OrderSubmitInterface>, SubmitError>,
	{
		let storage = build_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let submitter = build_primary(
			"submission",
			&self.config.submission.primary,
			&self.config.submission.implementations,
			&factories.submit_factories,
		)?;

		Ok(OrderFlow::new(
			self.config,
			Arc::new(StorageService::new(storage)),
			Arc::new(SubmitService::new(submitter)),
		))
	}
}
