// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. `RUST_LOG` overrides the default `info`
/// filter. Output goes to stderr so it lands in the pod log.
pub fn init_tracing(json: bool) -> Result<(), TryInitError> {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
	let registry = tracing_subscriber::registry().with(filter);

	if json {
		registry
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.try_init()
	} else {
		registry
			.with(fmt::layer().with_writer(std::io::stderr))
			.try_init()
	}
}
