// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Filesystem primitives used by the provisioner.
//!
//! [`HomeFs`] is the seam between provisioning logic and the host. [`OsFs`]
//! talks to the real filesystem; [`crate::testing::MemoryFs`] models ownership
//! states that an unprivileged test process cannot create.

use std::fs::DirBuilder;
use std::io;
use std::os::unix::fs::{DirBuilderExt, MetadataExt};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::Ownership;

/// Mode given to newly created home directories.
pub const PRIVATE_MODE: u32 = 0o700;

/// Creation mask that strips all group and other access.
pub const PRIVATE_UMASK: libc::mode_t = 0o077;

const PERMISSION_BITS: u32 = 0o777;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
	Directory,
	/// Regular file, symlink, socket, device or fifo.
	Other,
}

/// What `lstat(2)` reported for a path at one moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
	pub kind: EntryKind,
	pub owner: Ownership,
	/// Full `st_mode`, including file type bits.
	pub mode: u32,
}

impl Observation {
	pub fn is_dir(&self) -> bool {
		self.kind == EntryKind::Directory
	}

	pub fn permissions(&self) -> u32 {
		self.mode & PERMISSION_BITS
	}
}

pub trait HomeFs {
	/// Stat `path` without following a trailing symlink. `Ok(None)` means the
	/// path does not exist.
	fn observe(&self, path: &Path) -> io::Result<Option<Observation>>;

	/// Create a single directory with mode `0700`. Parents are not created.
	fn create_private_dir(&self, path: &Path) -> io::Result<()>;

	fn chown(&self, path: &Path, owner: Ownership) -> io::Result<()>;

	/// True when a listing of `path` returns zero entries.
	fn is_empty_dir(&self, path: &Path) -> io::Result<bool>;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl HomeFs for OsFs {
	fn observe(&self, path: &Path) -> io::Result<Option<Observation>> {
		let metadata = match std::fs::symlink_metadata(path) {
			Ok(metadata) => metadata,
			Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e),
		};
		let kind = if metadata.file_type().is_dir() {
			EntryKind::Directory
		} else {
			EntryKind::Other
		};
		Ok(Some(Observation {
			kind,
			owner: Ownership {
				uid: metadata.uid(),
				gid: metadata.gid(),
			},
			mode: metadata.mode(),
		}))
	}

	fn create_private_dir(&self, path: &Path) -> io::Result<()> {
		let _umask = UmaskGuard::set(PRIVATE_UMASK);
		DirBuilder::new().mode(PRIVATE_MODE).create(path)
	}

	fn chown(&self, path: &Path, owner: Ownership) -> io::Result<()> {
		std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid))
	}

	fn is_empty_dir(&self, path: &Path) -> io::Result<bool> {
		let first = std::fs::read_dir(path)?.next().transpose()?;
		Ok(first.is_none())
	}
}

static UMASK_LOCK: Mutex<()> = Mutex::new(());

/// Holds the process umask at a fixed value and restores the previous mask
/// on drop.
///
/// The umask is process-wide, so guards are serialized through a global lock
/// for their whole lifetime. Nesting guards on one thread deadlocks.
pub struct UmaskGuard {
	previous: libc::mode_t,
	_lock: MutexGuard<'static, ()>,
}

impl UmaskGuard {
	pub fn set(mask: libc::mode_t) -> Self {
		let lock = UMASK_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
		// SAFETY: umask(2) cannot fail and only swaps the process creation mask.
		let previous = unsafe { libc::umask(mask) };
		Self {
			previous,
			_lock: lock,
		}
	}
}

impl Drop for UmaskGuard {
	fn drop(&mut self) {
		// SAFETY: see `UmaskGuard::set`.
		unsafe {
			libc::umask(self.previous);
		}
	}
}
