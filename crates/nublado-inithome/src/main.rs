// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Init container entry point for Nublado home directories.

use anyhow::Context;
use clap::Parser;
use nublado_inithome::{init_tracing, HomeFs, InithomeArgs, Provisioner};

fn main() -> anyhow::Result<()> {
	let args = InithomeArgs::parse();

	init_tracing(args.log_json).context("failed to initialize logging")?;

	let provisioner = args.into_provisioner()?;
	provision_logged(&provisioner)
		.with_context(|| format!("failed to provision {}", provisioner.home().display()))?;
	Ok(())
}

/// Run the provisioner, reporting the outcome through the subscriber so it
/// lands in the JSON log stream as well.
fn provision_logged<F: HomeFs>(provisioner: &Provisioner<F>) -> nublado_inithome::Result<()> {
	if let Err(e) = provisioner.provision() {
		tracing::error!(
			home = %provisioner.home().display(),
			error = %e,
			"failed to provision home directory"
		);
		return Err(e);
	}

	tracing::info!(
		home = %provisioner.home().display(),
		uid = %provisioner.uid(),
		gid = %provisioner.gid(),
		"home directory ready"
	);
	Ok(())
}
