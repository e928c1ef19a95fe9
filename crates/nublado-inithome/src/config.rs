// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;
use crate::provisioner::Provisioner;

/// Create or verify a Nublado user's home directory.
///
/// Every option can also be set from the environment, which is how the lab
/// pod's init container receives them.
#[derive(Parser, Debug, Clone)]
#[command(name = "nublado-inithome", version)]
pub struct InithomeArgs {
	/// Absolute path to the user's home directory
	#[arg(long, env = "NUBLADO_HOME")]
	pub home: PathBuf,

	/// Numeric UID of the user
	#[arg(long, env = "NUBLADO_UID", allow_negative_numbers = true)]
	pub uid: i64,

	/// Numeric primary GID of the user
	#[arg(long, env = "NUBLADO_GID", allow_negative_numbers = true)]
	pub gid: i64,

	/// Emit logs as JSON lines
	#[arg(
		long,
		env = "NUBLADO_LOG_JSON",
		value_parser = clap::builder::FalseyValueParser::new()
	)]
	pub log_json: bool,
}

impl InithomeArgs {
	pub fn into_provisioner(self) -> Result<Provisioner, ConfigError> {
		if !self.home.is_absolute() {
			return Err(ConfigError::RelativeHome(self.home));
		}
		Ok(Provisioner::new(self.home, self.uid, self.gid)?)
	}
}
