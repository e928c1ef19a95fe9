// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Home directory provisioning for Nublado lab pods.
//!
//! Runs as an init container before the user's lab starts. Given a home
//! directory path and the user's numeric UID and GID, it makes sure the
//! directory exists, belongs to the user and is private, without touching
//! any data already there.
//!
//! # Overview
//!
//! 1. A missing home directory is created with mode 0700 and chowned to the user
//! 2. A path that exists but is not a directory is rejected
//! 3. A directory with the wrong owner is chowned only if it is empty, and
//!    rejected otherwise
//! 4. Permission bits other than 0700 are logged but never changed
//!
//! # Example
//!
//! ```ignore
//! use nublado_inithome::Provisioner;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provisioner = Provisioner::new("/home/leni", 2000, 200)?;
//!     provisioner.provision()?;
//!     Ok(())
//! }
//! ```

#[cfg(not(unix))]
compile_error!("nublado-inithome relies on POSIX ownership and only builds on Unix");

pub mod config;
pub mod error;
pub mod fs;
pub mod identity;
pub mod logging;
pub mod provisioner;
pub mod testing;

pub use config::InithomeArgs;
pub use error::{ConfigError, InvalidHomeReason, Ownership, ProvisionError, Result};
pub use fs::{EntryKind, HomeFs, Observation, OsFs, UmaskGuard};
pub use identity::{Identity, IdentityError, MAX_ID};
pub use logging::init_tracing;
pub use provisioner::Provisioner;
