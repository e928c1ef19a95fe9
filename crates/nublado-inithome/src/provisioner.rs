// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::error::{InvalidHomeReason, Ownership, ProvisionError, Result};
use crate::fs::{HomeFs, Observation, OsFs, PRIVATE_MODE};
use crate::identity::Identity;

/// Creates a user's home directory if it is missing and verifies it if not.
#[derive(Debug)]
pub struct Provisioner<F = OsFs> {
	home: PathBuf,
	uid: Identity,
	gid: Identity,
	fs: F,
}

impl Provisioner<OsFs> {
	/// Both identities are range-checked here, before any filesystem access.
	pub fn new(home: impl Into<PathBuf>, uid: i64, gid: i64) -> Result<Self> {
		Self::with_fs(home, uid, gid, OsFs)
	}
}

impl<F: HomeFs> Provisioner<F> {
	/// Trailing separators are dropped from `home`, otherwise `lstat(2)` would
	/// resolve a final symlink component.
	pub fn with_fs(home: impl Into<PathBuf>, uid: i64, gid: i64, fs: F) -> Result<Self> {
		Ok(Self {
			home: home.into().components().collect(),
			uid: Identity::new(uid)?,
			gid: Identity::new(gid)?,
			fs,
		})
	}

	pub fn home(&self) -> &Path {
		&self.home
	}

	pub fn uid(&self) -> Identity {
		self.uid
	}

	pub fn gid(&self) -> Identity {
		self.gid
	}

	pub fn fs(&self) -> &F {
		&self.fs
	}

	/// Create the home directory, or check an existing one.
	///
	/// A missing directory is created with mode 0700 and chowned to the
	/// user. An existing one must be a directory. If it has the wrong owner
	/// it is only adopted (and chowned) when empty. Unexpected permission
	/// bits are logged and left alone.
	///
	/// # Errors
	///
	/// [`ProvisionError::InvalidHome`] if the path is not a directory, or is a
	/// non-empty directory with the wrong owner. [`ProvisionError::Io`] for
	/// any failed system call.
	#[instrument(skip(self), fields(home = %self.home.display(), uid = %self.uid, gid = %self.gid))]
	pub fn provision(&self) -> Result<()> {
		let Some(observed) = self.fs.observe(&self.home)? else {
			self.fs.create_private_dir(&self.home)?;
			self.fs.chown(&self.home, self.expected_owner())?;
			debug!("created home directory");
			return Ok(());
		};

		if !observed.is_dir() {
			return Err(self.invalid_home(InvalidHomeReason::NotADirectory));
		}

		if self.uid != observed.owner.uid || self.gid != observed.owner.gid {
			self.adopt_empty(&observed)?;
		}

		let mode = observed.permissions();
		if mode != PRIVATE_MODE {
			warn!(
				path = %self.home.display(),
				actual_mode = %format!("0{mode:o}"),
				expected_mode = %format!("0{PRIVATE_MODE:o}"),
				"{} has unexpected permissions: 0{mode:o} != 0{PRIVATE_MODE:o}",
				self.home.display()
			);
		}

		Ok(())
	}

	fn adopt_empty(&self, observed: &Observation) -> Result<()> {
		let expected = self.expected_owner();
		if !self.fs.is_empty_dir(&self.home)? {
			return Err(self.invalid_home(InvalidHomeReason::OwnershipConflict {
				actual: observed.owner,
				expected,
			}));
		}

		warn!(
			path = %self.home.display(),
			actual_uid = observed.owner.uid,
			actual_gid = observed.owner.gid,
			expected_uid = expected.uid,
			expected_gid = expected.gid,
			"{} is owned by {}, not {} but is empty, resetting ownership",
			self.home.display(),
			observed.owner,
			expected
		);
		self.fs.chown(&self.home, expected)?;
		Ok(())
	}

	fn expected_owner(&self) -> Ownership {
		Ownership {
			uid: self.uid.get(),
			gid: self.gid.get(),
		}
	}

	fn invalid_home(&self, reason: InvalidHomeReason) -> ProvisionError {
		ProvisionError::InvalidHome {
			path: self.home.clone(),
			reason,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::identity::IdentityError;
	use crate::testing::MemoryFs;
	use tracing_test::traced_test;

	fn privileged_fs() -> MemoryFs {
		let fs = MemoryFs::new();
		fs.add_dir("/home", 0, 0, 0o755);
		fs
	}

	#[test]
	fn new_rejects_bad_ids() {
		let home = "/home/leni";
		for (uid, gid) in [(-1, 200), (2000, -1)] {
			let err = Provisioner::new(home, uid, gid).unwrap_err();
			assert!(matches!(
				err,
				ProvisionError::InvalidArgument(IdentityError::Negative(-1))
			));
			assert!(err.to_string().contains("must be nonnegative"));
		}
		for (uid, gid) in [(1 << 32, 200), (2000, (1 << 32) - 1)] {
			let err = Provisioner::new(home, uid, gid).unwrap_err();
			assert!(matches!(
				err,
				ProvisionError::InvalidArgument(IdentityError::OutOfRange(_))
			));
			assert!(err.to_string().contains("out of range"));
		}
	}

	#[test]
	fn trailing_separator_is_dropped() {
		let provisioner = Provisioner::new("/home/huld/", 4346, 4346).unwrap();
		assert_eq!(provisioner.home().to_str(), Some("/home/huld"));
	}

	#[test]
	fn new_accepts_root() {
		let provisioner = Provisioner::new("/home/root", 0, 0).unwrap();
		assert_eq!(provisioner.uid().get(), 0);
		assert_eq!(provisioner.gid().get(), 0);
		assert_eq!(provisioner.home(), Path::new("/home/root"));
	}

	#[test]
	fn creates_missing_home() {
		let provisioner =
			Provisioner::with_fs("/home/gregorsamsa", 2247, 200, privileged_fs()).unwrap();
		provisioner.provision().unwrap();

		let node = provisioner.fs().get("/home/gregorsamsa").unwrap();
		assert!(node.is_dir());
		assert_eq!(node.owner, Ownership { uid: 2247, gid: 200 });
		assert_eq!(node.permissions(), 0o700);
	}

	#[test]
	fn missing_parent_is_io_error() {
		let provisioner =
			Provisioner::with_fs("/home/j/josephk/nublado", 63928, 63928, privileged_fs())
				.unwrap();
		let err = provisioner.provision().unwrap_err();
		assert!(err.is_io(), "unexpected error: {err}");

		provisioner
			.fs()
			.add_dir("/home/j", 0, 0, 0o755)
			.add_dir("/home/j/josephk", 63928, 63928, 0o700);
		provisioner.provision().unwrap();
		let node = provisioner.fs().get("/home/j/josephk/nublado").unwrap();
		assert_eq!(node.owner, Ownership { uid: 63928, gid: 63928 });
	}

	#[test]
	#[traced_test]
	fn existing_home_is_left_alone() {
		let fs = privileged_fs();
		fs.add_dir("/home/leni", 2000, 200, 0o700);
		let provisioner = Provisioner::with_fs("/home/leni", 2000, 200, fs).unwrap();

		provisioner.provision().unwrap();
		provisioner.provision().unwrap();

		assert_eq!(provisioner.fs().mutations(), 0);
		logs_assert(|lines: &[&str]| match lines.len() {
			0 => Ok(()),
			n => Err(format!("expected no log output, got {n} lines")),
		});
	}

	#[test]
	fn non_empty_home_with_wrong_owner_is_rejected() {
		let fs = privileged_fs();
		fs.add_dir("/home/grubach", 9951, 500, 0o700)
			.add_file("/home/grubach/rents", 9951, 500, 0o600);
		let provisioner = Provisioner::with_fs("/home/grubach", 9942, 500, fs).unwrap();

		let err = provisioner.provision().unwrap_err();
		assert!(err.to_string().contains("and is not empty"));
		assert!(matches!(
			err,
			ProvisionError::InvalidHome {
				reason: InvalidHomeReason::OwnershipConflict { .. },
				..
			}
		));
		let node = provisioner.fs().get("/home/grubach").unwrap();
		assert_eq!(node.owner, Ownership { uid: 9951, gid: 500 });
		assert_eq!(provisioner.fs().mutations(), 0);
	}

	#[test]
	fn dotfile_makes_home_non_empty() {
		let fs = privileged_fs();
		fs.add_dir("/home/karl", 1088, 517, 0o700)
			.add_file("/home/karl/.bash_history", 1088, 517, 0o600);
		let provisioner = Provisioner::with_fs("/home/karl", 1088, 500, fs).unwrap();

		let err = provisioner.provision().unwrap_err();
		assert!(err.is_invalid_home());
	}

	#[test]
	#[traced_test]
	fn empty_home_with_wrong_group_is_adopted() {
		let fs = privileged_fs();
		fs.add_dir("/home/karl", 1088, 517, 0o700);
		let provisioner = Provisioner::with_fs("/home/karl", 1088, 500, fs).unwrap();

		provisioner.provision().unwrap();

		let node = provisioner.fs().get("/home/karl").unwrap();
		assert_eq!(node.owner, Ownership { uid: 1088, gid: 500 });
		assert_eq!(node.permissions(), 0o700);
		assert!(logs_contain(
			"/home/karl is owned by 1088:517, not 1088:500 but is empty, resetting ownership"
		));
		logs_assert(|lines: &[&str]| {
			match lines.iter().filter(|line| line.contains("WARN")).count() {
				1 => Ok(()),
				n => Err(format!("expected one warning, got {n}")),
			}
		});
	}

	#[test]
	fn failed_chown_is_io_error() {
		let fs = privileged_fs();
		fs.add_dir("/home/karl", 1088, 517, 0o700);
		fs.deny_chown();
		let provisioner = Provisioner::with_fs("/home/karl", 1088, 500, fs).unwrap();

		let err = provisioner.provision().unwrap_err();
		assert!(err.is_io());
		assert!(!err.is_invalid_home());
	}

	#[test]
	fn file_is_not_a_home() {
		let fs = privileged_fs();
		fs.add_file("/home/huld", 4346, 4346, 0o700);
		let provisioner = Provisioner::with_fs("/home/huld", 4346, 4346, fs).unwrap();

		let err = provisioner.provision().unwrap_err();
		assert!(err.to_string().contains("but is not a directory"));
		assert!(matches!(
			err,
			ProvisionError::InvalidHome {
				reason: InvalidHomeReason::NotADirectory,
				..
			}
		));
	}

	#[test]
	fn symlink_is_not_a_home() {
		let fs = privileged_fs();
		fs.add_dir("/srv/huld", 4346, 4346, 0o700)
			.add_symlink("/home/huld");
		let provisioner = Provisioner::with_fs("/home/huld", 4346, 4346, fs).unwrap();

		let err = provisioner.provision().unwrap_err();
		assert!(err.is_invalid_home());
	}

	#[test]
	#[traced_test]
	fn wrong_permissions_are_reported_not_fixed() {
		let fs = privileged_fs();
		fs.add_dir("/home/burstner", 7304, 7304, 0o775);
		let provisioner = Provisioner::with_fs("/home/burstner", 7304, 7304, fs).unwrap();

		provisioner.provision().unwrap();

		let node = provisioner.fs().get("/home/burstner").unwrap();
		assert_eq!(node.permissions(), 0o775);
		assert_eq!(provisioner.fs().mutations(), 0);
		assert!(logs_contain(
			"/home/burstner has unexpected permissions: 0775 != 0700"
		));
		logs_assert(|lines: &[&str]| {
			match lines.iter().filter(|line| line.contains("WARN")).count() {
				1 => Ok(()),
				n => Err(format!("expected one warning, got {n}")),
			}
		});
	}

	#[test]
	#[traced_test]
	fn adopted_home_with_wrong_mode_warns_twice() {
		let fs = privileged_fs();
		fs.add_dir("/home/karl", 1088, 517, 0o755);
		let provisioner = Provisioner::with_fs("/home/karl", 1088, 500, fs).unwrap();

		provisioner.provision().unwrap();

		assert!(logs_contain("resetting ownership"));
		assert!(logs_contain("unexpected permissions: 0755 != 0700"));
	}
}
