// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory [`HomeFs`] for tests.
//!
//! Behaves like a filesystem seen by root: every chown succeeds unless
//! explicitly denied, and new directories are owned by the configured process
//! identity until chowned.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Ownership;
use crate::fs::{EntryKind, HomeFs, Observation, PRIVATE_MODE};

const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;

#[derive(Debug)]
pub struct MemoryFs {
	nodes: RefCell<BTreeMap<PathBuf, Observation>>,
	process_owner: Ownership,
	mutations: Cell<usize>,
	deny_chown: Cell<bool>,
}

impl Default for MemoryFs {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryFs {
	/// An empty filesystem containing only `/`, running as root.
	pub fn new() -> Self {
		let fs = Self {
			nodes: RefCell::new(BTreeMap::new()),
			process_owner: Ownership { uid: 0, gid: 0 },
			mutations: Cell::new(0),
			deny_chown: Cell::new(false),
		};
		fs.insert("/", EntryKind::Directory, S_IFDIR | 0o755, 0, 0);
		fs
	}

	pub fn add_dir(&self, path: impl AsRef<Path>, uid: u32, gid: u32, perms: u32) -> &Self {
		self.insert(path, EntryKind::Directory, S_IFDIR | perms, uid, gid);
		self
	}

	pub fn add_file(&self, path: impl AsRef<Path>, uid: u32, gid: u32, perms: u32) -> &Self {
		self.insert(path, EntryKind::Other, S_IFREG | perms, uid, gid);
		self
	}

	pub fn add_symlink(&self, path: impl AsRef<Path>) -> &Self {
		self.insert(path, EntryKind::Other, S_IFLNK | 0o777, 0, 0);
		self
	}

	/// Make every subsequent chown fail with `EPERM`.
	pub fn deny_chown(&self) {
		self.deny_chown.set(true);
	}

	pub fn get(&self, path: impl AsRef<Path>) -> Option<Observation> {
		self.nodes.borrow().get(path.as_ref()).copied()
	}

	/// Number of mkdir and chown calls that changed state.
	pub fn mutations(&self) -> usize {
		self.mutations.get()
	}

	fn insert(&self, path: impl AsRef<Path>, kind: EntryKind, mode: u32, uid: u32, gid: u32) {
		self.nodes.borrow_mut().insert(
			path.as_ref().to_path_buf(),
			Observation {
				kind,
				owner: Ownership { uid, gid },
				mode,
			},
		);
	}
}

impl HomeFs for MemoryFs {
	fn observe(&self, path: &Path) -> io::Result<Option<Observation>> {
		Ok(self.get(path))
	}

	fn create_private_dir(&self, path: &Path) -> io::Result<()> {
		if self.nodes.borrow().contains_key(path) {
			return Err(io::Error::from(io::ErrorKind::AlreadyExists));
		}
		let parent_is_dir = path
			.parent()
			.and_then(|parent| self.get(parent))
			.is_some_and(|parent| parent.is_dir());
		if !parent_is_dir {
			return Err(io::Error::from(io::ErrorKind::NotFound));
		}

		let owner = self.process_owner;
		self.insert(
			path,
			EntryKind::Directory,
			S_IFDIR | PRIVATE_MODE,
			owner.uid,
			owner.gid,
		);
		self.mutations.set(self.mutations.get() + 1);
		Ok(())
	}

	fn chown(&self, path: &Path, owner: Ownership) -> io::Result<()> {
		if self.deny_chown.get() {
			return Err(io::Error::from_raw_os_error(libc::EPERM));
		}
		let mut nodes = self.nodes.borrow_mut();
		let node = nodes
			.get_mut(path)
			.ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
		node.owner = owner;
		self.mutations.set(self.mutations.get() + 1);
		Ok(())
	}

	fn is_empty_dir(&self, path: &Path) -> io::Result<bool> {
		let nodes = self.nodes.borrow();
		match nodes.get(path) {
			Some(node) if node.is_dir() => {}
			Some(_) => return Err(io::Error::from_raw_os_error(libc::ENOTDIR)),
			None => return Err(io::Error::from(io::ErrorKind::NotFound)),
		}
		Ok(!nodes.keys().any(|key| key.parent() == Some(path)))
	}
}
