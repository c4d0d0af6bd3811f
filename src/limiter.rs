//! Per-identity token-bucket admission control.
//!
//! The [`RateLimiterRegistry`] lazily creates one [`TokenBucket`] per identity key and guards the
//! whole map with a single mutex held for the complete lookup-or-create, refill, and decrement
//! sequence. Concurrent callers for the same key are therefore serialized, and a bucket never
//! hands out more than its capacity plus whatever accrued since the last refill. The critical
//! section is O(1) arithmetic with no I/O.

// self
use crate::{_prelude::*, auth::UserId, error::ConfigError};

/// Shape shared by every bucket the registry creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketSettings {
	/// Maximum number of tokens a bucket holds (and starts with).
	pub capacity: u32,
	/// Time it takes to accrue one token.
	pub refill_interval: Duration,
}
impl BucketSettings {
	/// Creates settings for the given capacity and per-token refill interval.
	///
	/// The values are not checked here; see [`BucketSettings::validate`].
	pub fn new(capacity: u32, refill_interval: Duration) -> Self {
		Self { capacity, refill_interval }
	}

	/// Rejects shapes a bucket cannot operate with: zero capacity or a non-positive interval.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.capacity == 0 {
			return Err(ConfigError::ZeroCapacity);
		}
		if !self.refill_interval.is_positive() {
			return Err(ConfigError::NonPositiveRefillInterval);
		}

		Ok(())
	}

	/// Time for an empty bucket to refill completely.
	pub fn full_refill(&self) -> Duration {
		self.refill_interval.saturating_mul(i32::try_from(self.capacity).unwrap_or(i32::MAX))
	}
}

/// Lifetime policy for registry entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
	/// Entries live for the life of the process.
	#[default]
	Never,
	/// [`RateLimiterRegistry::sweep_idle_at`] drops entries unused for at least this long.
	///
	/// The effective TTL is never shorter than the bucket's full-refill time, so an evicted
	/// bucket is indistinguishable from the fresh one that replaces it.
	IdleFor(Duration),
}

/// Lazily refilled token bucket owned by a single registry entry.
#[derive(Clone, Debug)]
pub struct TokenBucket {
	settings: BucketSettings,
	tokens: f64,
	last_refill: OffsetDateTime,
}
impl TokenBucket {
	/// Creates a full bucket.
	pub fn new(settings: BucketSettings, now: OffsetDateTime) -> Self {
		Self { settings, tokens: f64::from(settings.capacity), last_refill: now }
	}

	/// Tokens currently available, without refilling.
	pub fn tokens(&self) -> f64 {
		self.tokens
	}

	/// Instant of the last refill (and therefore the last use).
	pub fn last_refill(&self) -> OffsetDateTime {
		self.last_refill
	}

	/// Refills according to elapsed time, then takes one token if available.
	pub fn try_acquire(&mut self, now: OffsetDateTime) -> bool {
		self.refill(now);

		if self.tokens >= 1.0 {
			self.tokens -= 1.0;

			true
		} else {
			false
		}
	}

	fn refill(&mut self, now: OffsetDateTime) {
		let elapsed = now - self.last_refill;

		// Clock regressions accrue nothing and keep the newer reference point. A non-positive
		// interval never accrues either, so it can only ever deny.
		if elapsed.is_positive() && self.settings.refill_interval.is_positive() {
			let accrued = elapsed.as_seconds_f64() / self.settings.refill_interval.as_seconds_f64();

			self.tokens = (self.tokens + accrued).min(f64::from(self.settings.capacity));
			self.last_refill = now;
		}
	}
}

/// Registry mapping identity keys to their token buckets.
#[derive(Debug)]
pub struct RateLimiterRegistry {
	settings: BucketSettings,
	eviction: EvictionPolicy,
	buckets: Mutex<HashMap<UserId, TokenBucket>>,
}
impl RateLimiterRegistry {
	/// Creates an empty registry whose buckets share `settings`.
	///
	/// `settings` must pass [`BucketSettings::validate`]; configuration loading already enforces
	/// this, and debug builds assert it here.
	pub fn new(settings: BucketSettings) -> Self {
		debug_assert!(settings.validate().is_ok(), "invalid bucket settings: {settings:?}");

		Self { settings, eviction: EvictionPolicy::Never, buckets: Default::default() }
	}

	/// Sets the eviction policy applied by [`RateLimiterRegistry::sweep_idle_at`].
	pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
		self.eviction = eviction;

		self
	}

	/// Bucket shape used for new entries.
	pub fn settings(&self) -> BucketSettings {
		self.settings
	}

	/// Eviction policy in effect.
	pub fn eviction(&self) -> EvictionPolicy {
		self.eviction
	}

	/// Consumes one token for `key` at the current instant.
	pub fn allow(&self, key: &UserId) -> bool {
		self.allow_at(key, OffsetDateTime::now_utc())
	}

	/// Consumes one token for `key` at the provided instant.
	///
	/// A never-seen key starts with a full bucket, so its first call always succeeds.
	pub fn allow_at(&self, key: &UserId, now: OffsetDateTime) -> bool {
		let mut buckets = self.buckets.lock();
		let settings = self.settings;

		buckets
			.entry(key.clone())
			.or_insert_with(|| TokenBucket::new(settings, now))
			.try_acquire(now)
	}

	/// Number of live entries.
	pub fn len(&self) -> usize {
		self.buckets.lock().len()
	}

	/// Returns `true` when no identity has been seen (or all were evicted).
	pub fn is_empty(&self) -> bool {
		self.buckets.lock().is_empty()
	}

	/// Applies the eviction policy at the current instant.
	pub fn sweep_idle(&self) -> usize {
		self.sweep_idle_at(OffsetDateTime::now_utc())
	}

	/// Applies the eviction policy at the provided instant, returning how many entries were
	/// dropped.
	pub fn sweep_idle_at(&self, now: OffsetDateTime) -> usize {
		let EvictionPolicy::IdleFor(ttl) = self.eviction else {
			return 0;
		};
		let ttl = ttl.max(self.settings.full_refill());
		let mut buckets = self.buckets.lock();
		let before = buckets.len();

		buckets.retain(|_, bucket| now - bucket.last_refill < ttl);

		before - buckets.len()
	}
}
