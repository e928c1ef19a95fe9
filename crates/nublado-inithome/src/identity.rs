// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Range-checked numeric UIDs and GIDs.

use std::fmt;

use thiserror::Error;

/// Largest UID or GID accepted.
///
/// `u32::MAX` is `(uid_t)-1`, which `chown(2)` treats as "leave unchanged",
/// so it can never name a real owner.
pub const MAX_ID: i64 = (u32::MAX - 1) as i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentityError {
	#[error("UID or GID must be nonnegative, not {0}")]
	Negative(i64),

	#[error("UID or GID out of range ({} > {})", .0, MAX_ID)]
	OutOfRange(i64),
}

/// A validated UID or GID.
///
/// Zero is accepted. Rejecting root is a policy decision that belongs to
/// whoever issued the identity, not to this range check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(u32);

impl Identity {
	pub fn new(raw: i64) -> Result<Self, IdentityError> {
		if raw < 0 {
			return Err(IdentityError::Negative(raw));
		}
		if raw > MAX_ID {
			return Err(IdentityError::OutOfRange(raw));
		}
		Ok(Self(raw as u32))
	}

	pub fn get(self) -> u32 {
		self.0
	}
}

impl TryFrom<i64> for Identity {
	type Error = IdentityError;

	fn try_from(raw: i64) -> Result<Self, Self::Error> {
		Self::new(raw)
	}
}

impl From<Identity> for u32 {
	fn from(id: Identity) -> Self {
		id.0
	}
}

impl PartialEq<u32> for Identity {
	fn eq(&self, other: &u32) -> bool {
		self.0 == *other
	}
}

impl fmt::Display for Identity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}
