// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build information shared by `keeper-server` and `keeper`.

shadow_rs::shadow!(build);

use serde::Serialize;

/// `{os}-{arch}` of the build target.
pub const PLATFORM: &str = env!("KEEPER_PLATFORM");

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
	pub version: &'static str,
	pub git_sha: &'static str,
	pub build_timestamp: &'static str,
	pub platform: &'static str,
}

impl BuildInfo {
	#[allow(clippy::const_is_empty)]
	pub const fn current() -> Self {
		Self {
			version: build::PKG_VERSION,
			git_sha: if build::SHORT_COMMIT.is_empty() {
				"N/A"
			} else {
				build::SHORT_COMMIT
			},
			build_timestamp: build::BUILD_TIME,
			platform: PLATFORM,
		}
	}
}

/// Multi-line banner printed by the `version` subcommands.
pub fn format_build_info(binary: &str) -> String {
	let info = BuildInfo::current();
	format!(
		"{binary} {}\nBuild version: {}\nBuild date: {}\nBuild commit: {}\nPlatform: {}",
		info.version, info.version, info.build_timestamp, info.git_sha, info.platform
	)
}
