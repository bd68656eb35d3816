//! Configuration for the campus order flow.
//!
//! Configuration is read from TOML. String values may reference environment
//! variables as `${NAME}` or `${NAME:-default}`. A file may pull other files in
//! with `include = ["other.toml"]`; every top-level section must then be
//! defined in exactly one file.

mod loader;

pub use loader::ConfigLoader;

use order_types::DEFAULT_PICKUP_POINT;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Message shown when a submission fails without a message of its own.
pub const DEFAULT_SUBMIT_ERROR_MESSAGE: &str = "Failed to place order. Please try again.";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default Display dumps the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Order flow behaviour.
	#[serde(default)]
	pub flow: FlowConfig,
	/// Backend used to persist carts and confirmed orders.
	pub storage: StorageConfig,
	/// Collaborator that submits orders to the remote order API.
	pub submission: SubmissionConfig,
	/// HTTP session API.
	pub api: Option<ApiConfig>,
}

/// Defaults applied to every new order context.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowConfig {
	/// Pickup point a fresh draft starts with.
	#[serde(default = "default_pickup_point")]
	pub default_pickup_point: String,
	/// Fallback message for failed submissions that carry no message.
	#[serde(default = "default_submit_error_message")]
	pub submit_error_message: String,
	/// Seconds a session may go unused before it is evicted.
	#[serde(default = "default_session_idle_timeout")]
	pub session_idle_timeout_seconds: u64,
}

impl Default for FlowConfig {
	fn default() -> Self {
		Self {
			default_pickup_point: default_pickup_point(),
			submit_error_message: default_submit_error_message(),
			session_idle_timeout_seconds: default_session_idle_timeout(),
		}
	}
}

fn default_pickup_point() -> String {
	DEFAULT_PICKUP_POINT.to_string()
}

fn default_submit_error_message() -> String {
	DEFAULT_SUBMIT_ERROR_MESSAGE.to_string()
}

fn default_session_idle_timeout() -> u64 {
	1800
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Implementation name to its raw configuration table.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds between sweeps of expired entries.
	#[serde(default = "default_cleanup_interval")]
	pub cleanup_interval_seconds: u64,
}

fn default_cleanup_interval() -> u64 {
	3600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmissionConfig {
	/// Which implementation submits orders.
	pub primary: String,
	/// Implementation name to its raw configuration table.
	pub implementations: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// Allowed CORS origins. Empty means any origin.
	#[serde(default)]
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_max_request_size() -> usize {
	64 * 1024
}

/// Replaces `${VAR}` and `${VAR:-default}` with environment values.
///
/// Fails when a referenced variable is unset and has no default. Inputs are
/// capped at 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let var_name = &caps[1];
		match std::env::var(var_name) {
			Ok(value) => value,
			Err(_) => match caps.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					missing.get_or_insert_with(|| var_name.to_string());
					String::new()
				},
			},
		}
	});

	if let Some(var_name) = missing {
		return Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			var_name
		)));
	}

	Ok(resolved.into_owned())
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path.file_name().ok_or_else(|| {
			ConfigError::Validation(format!("Invalid path: {}", path.display()))
		})?;

		let mut loader = ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.flow.default_pickup_point.trim().is_empty() {
			return Err(ConfigError::Validation(
				"flow.default_pickup_point cannot be empty".into(),
			));
		}
		if self.flow.submit_error_message.trim().is_empty() {
			return Err(ConfigError::Validation(
				"flow.submit_error_message cannot be empty".into(),
			));
		}
		if self.flow.session_idle_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"flow.session_idle_timeout_seconds must be greater than 0".into(),
			));
		}

		validate_primary("storage", &self.storage.primary, &self.storage.implementations)?;
		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		validate_primary(
			"submission",
			&self.submission.primary,
			&self.submission.implementations,
		)?;

		if let Some(api) = self.api.as_ref().filter(|api| api.enabled) {
			if api.host.is_empty() {
				return Err(ConfigError::Validation("api.host cannot be empty".into()));
			}
			if api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"api.max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

/// Minimal valid configuration: memory storage and mock submission.
#[cfg(any(test, feature = "testing"))]
pub fn test_config() -> Config {
	let empty = || toml::Value::Table(toml::map::Map::new());
	Config {
		flow: FlowConfig::default(),
		storage: StorageConfig {
			primary: "memory".to_string(),
			implementations: HashMap::from([("memory".to_string(), empty())]),
			cleanup_interval_seconds: 60,
		},
		submission: SubmissionConfig {
			primary: "mock".to_string(),
			implementations: HashMap::from([("mock".to_string(), empty())]),
		},
		api: None,
	}
}
