// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod auth;
mod database;
mod flush;
mod http;
mod logging;

pub use auth::{AuthConfig, AuthConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use flush::{FailurePolicy, FlushConfig, FlushConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};

use std::time::Duration;

use crate::error::ConfigError;

pub(crate) fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
	humantime::parse_duration(value).map_err(|e| ConfigError::InvalidValue {
		key: key.to_string(),
		message: format!("invalid duration '{value}': {e}"),
	})
}
