// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::identity::IdentityError;

/// A `uid:gid` pair as reported by `stat(2)` or requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
	pub uid: u32,
	pub gid: u32,
}

impl fmt::Display for Ownership {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.uid, self.gid)
	}
}

/// Why an existing path cannot be adopted as the home directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidHomeReason {
	#[error("exists but is not a directory")]
	NotADirectory,

	#[error("is owned by {actual}, not {expected} and is not empty")]
	OwnershipConflict {
		actual: Ownership,
		expected: Ownership,
	},
}

#[derive(Debug, Error)]
pub enum ProvisionError {
	#[error("invalid argument: {0}")]
	InvalidArgument(#[from] IdentityError),

	#[error("{} {reason}", .path.display())]
	InvalidHome {
		path: PathBuf,
		reason: InvalidHomeReason,
	},

	#[error("filesystem operation failed: {0}")]
	Io(#[from] std::io::Error),
}

impl ProvisionError {
	pub fn is_invalid_home(&self) -> bool {
		matches!(self, Self::InvalidHome { .. })
	}

	pub fn is_io(&self) -> bool {
		matches!(self, Self::Io(_))
	}
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("home directory must be an absolute path, not {}", .0.display())]
	RelativeHome(PathBuf),

	#[error(transparent)]
	Provision(#[from] ProvisionError),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
