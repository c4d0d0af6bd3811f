//! Request admission control: signed-token authentication, typed identity scopes, and
//! per-identity token-bucket throttling applied before a request reaches business logic.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod account;
pub mod admission;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod limiter;
pub mod obs;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		admission::AdmissionChain,
		auth::{BYPASS_CREDENTIAL, SigningKey},
		config::{AdmissionConfig, RateLimitConfig},
	};

	/// Signing key shared by the test fixtures.
	pub const TEST_SIGNING_KEY: &str = "test-signing-key";

	/// Returns a header map that passes the bypass credential check.
	pub fn mock_auth_header() -> http::HeaderMap {
		let mut headers = http::HeaderMap::new();

		headers.insert(
			http::header::AUTHORIZATION,
			http::HeaderValue::from_static(BYPASS_CREDENTIAL),
		);

		headers
	}

	/// Builds a configuration that accepts the bypass credential and uses the given bucket shape.
	pub fn test_config(capacity: u32, refill_interval: Duration) -> AdmissionConfig {
		AdmissionConfig::new(SigningKey::new(TEST_SIGNING_KEY))
			.with_rate_limit(RateLimitConfig::new(capacity, refill_interval))
			.with_test_bypass(BYPASS_CREDENTIAL)
	}

	/// Constructs an [`AdmissionChain`] from [`test_config`].
	pub fn build_test_chain(capacity: u32, refill_interval: Duration) -> AdmissionChain {
		AdmissionChain::from_config(&test_config(capacity, refill_interval))
			.expect("Test admission configuration should be valid.")
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

pub use http;
#[cfg(test)] use {color_eyre as _, tokio as _};
