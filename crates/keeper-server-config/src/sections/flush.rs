// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Staging flush configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use super::parse_duration;
use crate::error::ConfigError;

const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
const MAX_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_DEAD_LETTER_CAPACITY: usize = 1024;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// What the flush does with a staged write the store rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
	/// Keep the entry staged and try again next sweep, up to
	/// `max_attempts` times before dead-lettering it.
	#[default]
	Retry,
	/// Drop the entry from the cache and keep it in the dead-letter list.
	DeadLetter,
}

impl fmt::Display for FailurePolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FailurePolicy::Retry => f.write_str("retry"),
			FailurePolicy::DeadLetter => f.write_str("dead_letter"),
		}
	}
}

impl FromStr for FailurePolicy {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().replace('-', "_").as_str() {
			"retry" => Ok(FailurePolicy::Retry),
			"dead_letter" => Ok(FailurePolicy::DeadLetter),
			other => Err(ConfigError::InvalidValue {
				key: "flush.failure_policy".to_string(),
				message: format!("expected 'retry' or 'dead_letter', got '{other}'"),
			}),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushConfig {
	pub interval: Duration,
	pub failure_policy: FailurePolicy,
	/// Upper bound on a single store call made by the flush.
	pub store_timeout: Duration,
	pub dead_letter_capacity: usize,
	/// Failed sweeps a staged entry survives under [`FailurePolicy::Retry`].
	pub max_attempts: u32,
}

impl Default for FlushConfig {
	fn default() -> Self {
		Self {
			interval: DEFAULT_INTERVAL,
			failure_policy: FailurePolicy::Retry,
			store_timeout: DEFAULT_STORE_TIMEOUT,
			dead_letter_capacity: DEFAULT_DEAD_LETTER_CAPACITY,
			max_attempts: DEFAULT_MAX_ATTEMPTS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlushConfigLayer {
	#[serde(default)]
	pub interval: Option<String>,
	#[serde(default)]
	pub failure_policy: Option<FailurePolicy>,
	#[serde(default)]
	pub store_timeout: Option<String>,
	#[serde(default)]
	pub dead_letter_capacity: Option<usize>,
	#[serde(default)]
	pub max_attempts: Option<u32>,
}

impl FlushConfigLayer {
	pub fn merge(&mut self, other: FlushConfigLayer) {
		if other.interval.is_some() {
			self.interval = other.interval;
		}
		if other.failure_policy.is_some() {
			self.failure_policy = other.failure_policy;
		}
		if other.store_timeout.is_some() {
			self.store_timeout = other.store_timeout;
		}
		if other.dead_letter_capacity.is_some() {
			self.dead_letter_capacity = other.dead_letter_capacity;
		}
		if other.max_attempts.is_some() {
			self.max_attempts = other.max_attempts;
		}
	}

	pub fn finalize(self) -> Result<FlushConfig, ConfigError> {
		let interval = match self.interval {
			Some(raw) => parse_duration("flush.interval", &raw)?,
			None => DEFAULT_INTERVAL,
		};
		if interval.is_zero() || interval > MAX_INTERVAL {
			return Err(ConfigError::Validation(format!(
				"flush.interval must be between 1ms and {}s",
				MAX_INTERVAL.as_secs()
			)));
		}

		let store_timeout = match self.store_timeout {
			Some(raw) => parse_duration("flush.store_timeout", &raw)?,
			None => DEFAULT_STORE_TIMEOUT,
		};
		if store_timeout.is_zero() {
			return Err(ConfigError::Validation(
				"flush.store_timeout must be greater than zero".to_string(),
			));
		}

		let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
		if max_attempts == 0 {
			return Err(ConfigError::Validation(
				"flush.max_attempts must be at least 1".to_string(),
			));
		}

		Ok(FlushConfig {
			interval,
			failure_policy: self.failure_policy.unwrap_or_default(),
			store_timeout,
			dead_letter_capacity: self
				.dead_letter_capacity
				.unwrap_or(DEFAULT_DEAD_LETTER_CAPACITY),
			max_attempts,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_interval_is_sub_second() {
		let config = FlushConfigLayer::default().finalize().unwrap();
		assert!(config.interval < Duration::from_secs(1));
		assert_eq!(config.failure_policy, FailurePolicy::Retry);
	}

	#[test]
	fn interval_bounds_are_enforced() {
		for bad in ["0s", "11s"] {
			let layer = FlushConfigLayer {
				interval: Some(bad.to_string()),
				..Default::default()
			};
			assert!(matches!(layer.finalize(), Err(ConfigError::Validation(_))));
		}
	}

	#[test]
	fn max_attempts_must_allow_one_try() {
		let layer = FlushConfigLayer {
			max_attempts: Some(0),
			..Default::default()
		};
		assert!(matches!(layer.finalize(), Err(ConfigError::Validation(_))));
		assert_eq!(FlushConfigLayer::default().finalize().unwrap().max_attempts, 5);
	}

	#[test]
	fn policy_parses_both_spellings() {
		assert_eq!("dead-letter".parse::<FailurePolicy>().unwrap(), FailurePolicy::DeadLetter);
		assert_eq!("RETRY".parse::<FailurePolicy>().unwrap(), FailurePolicy::Retry);
		assert!("drop".parse::<FailurePolicy>().is_err());
	}

	#[test]
	fn policy_deserializes_from_toml() {
		let layer: FlushConfigLayer = toml::from_str("failure_policy = \"dead_letter\"").unwrap();
		assert_eq!(layer.failure_policy, Some(FailurePolicy::DeadLetter));
	}
}
