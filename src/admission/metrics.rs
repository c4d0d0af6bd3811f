//! Process-local counters for admission decisions.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for admission decisions.
#[derive(Debug, Default)]
pub struct AdmissionMetrics {
	admitted: AtomicU64,
	unauthenticated: AtomicU64,
	rate_limited: AtomicU64,
	internal: AtomicU64,
}
impl AdmissionMetrics {
	/// Returns the number of requests forwarded downstream.
	pub fn admitted(&self) -> u64 {
		self.admitted.load(Ordering::Relaxed)
	}

	/// Returns the number of requests rejected as unauthenticated.
	pub fn unauthenticated(&self) -> u64 {
		self.unauthenticated.load(Ordering::Relaxed)
	}

	/// Returns the number of requests rejected by the rate limiter.
	pub fn rate_limited(&self) -> u64 {
		self.rate_limited.load(Ordering::Relaxed)
	}

	/// Returns the number of requests that failed inside admission plumbing.
	pub fn internal(&self) -> u64 {
		self.internal.load(Ordering::Relaxed)
	}

	pub(crate) fn record_admitted(&self) {
		self.admitted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_unauthenticated(&self) {
		self.unauthenticated.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rate_limited(&self) {
		self.rate_limited.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_internal(&self) {
		self.internal.fetch_add(1, Ordering::Relaxed);
	}
}
