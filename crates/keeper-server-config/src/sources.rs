// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file and the environment.

use std::collections::HashMap;
use std::path::PathBuf;

use keeper_common_crypto::SecretString;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuthConfigLayer, DatabaseConfigLayer, FailurePolicy, FlushConfigLayer, HttpConfigLayer, LogFormat,
	LoggingConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/keeper/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `KEEPER_SERVER_<FIELD>`.
#[derive(Default)]
pub struct EnvSource {
	overrides: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn process() -> Self {
		Self::default()
	}

	/// Reads only the given variables.
	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			overrides: Some(
				vars.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.overrides {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn parsed<T: std::str::FromStr>(&self, name: &str, what: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {what} value '{v}'"),
			}),
			None => Ok(None),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");

		let failure_policy = self
			.var("KEEPER_SERVER_FLUSH_FAILURE_POLICY")
			.map(|v| v.parse::<FailurePolicy>())
			.transpose()?;

		let format = match self.var("KEEPER_SERVER_LOG_FORMAT") {
			Some(v) if v.eq_ignore_ascii_case("json") => Some(LogFormat::Json),
			Some(v) if v.eq_ignore_ascii_case("pretty") => Some(LogFormat::Pretty),
			Some(v) => {
				return Err(ConfigError::InvalidValue {
					key: "KEEPER_SERVER_LOG_FORMAT".to_string(),
					message: format!("expected 'pretty' or 'json', got '{v}'"),
				})
			}
			None => None,
		};

		Ok(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: self.var("KEEPER_SERVER_HOST"),
				port: self.parsed("KEEPER_SERVER_PORT", "u16")?,
			}),
			database: Some(DatabaseConfigLayer {
				url: self.var("KEEPER_SERVER_DATABASE_URL"),
			}),
			auth: Some(AuthConfigLayer {
				hash_key: self.var("KEEPER_SERVER_HASH_KEY").map(SecretString::from),
				jwt_secret: self.var("KEEPER_SERVER_JWT_SECRET").map(SecretString::from),
				token_ttl: self.var("KEEPER_SERVER_TOKEN_TTL"),
				login_attempts_per_minute: self.parsed("KEEPER_SERVER_LOGIN_RATE", "u32")?,
			}),
			flush: Some(FlushConfigLayer {
				interval: self.var("KEEPER_SERVER_FLUSH_INTERVAL"),
				failure_policy,
				store_timeout: self.var("KEEPER_SERVER_STORE_TIMEOUT"),
				dead_letter_capacity: self.parsed("KEEPER_SERVER_DEAD_LETTER_CAPACITY", "usize")?,
				max_attempts: self.parsed("KEEPER_SERVER_FLUSH_MAX_ATTEMPTS", "u32")?,
			}),
			logging: Some(LoggingConfigLayer {
				level: self.var("KEEPER_SERVER_LOG_LEVEL"),
				format,
			}),
		})
	}
}
