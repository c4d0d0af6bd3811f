//! Startup configuration for the admission layer.
//!
//! Values are supplied once when the process starts and never re-read. Documents are JSON;
//! missing fields fall back to the defaults below and parse failures report the offending path.

// self
use crate::{
	_prelude::*,
	auth::SigningKey,
	error::ConfigError,
	limiter::{BucketSettings, EvictionPolicy},
};

const DEFAULT_TOKEN_VALIDITY_HOURS: u32 = 72;
/// Longest accepted credential validity (one year).
pub const MAX_TOKEN_VALIDITY_HOURS: u32 = 24 * 365;
const DEFAULT_CAPACITY: u32 = 10;
// One token per minute; expected to move to per-second granularity once clients adapt.
const DEFAULT_REFILL_INTERVAL_MS: u64 = 60_000;

/// Complete admission configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdmissionConfig {
	/// Symmetric key used to sign and verify credentials.
	pub signing_key: SigningKey,
	/// Credential validity window in hours.
	#[serde(default = "default_token_validity_hours")]
	pub token_validity_hours: u32,
	/// Per-identity throttling parameters.
	#[serde(default)]
	pub rate_limit: RateLimitConfig,
	/// Credential accepted as the fixed test identity; must stay unset in production.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub test_bypass: Option<String>,
}
impl AdmissionConfig {
	/// Creates a configuration with defaults for everything but the signing key.
	pub fn new(signing_key: SigningKey) -> Self {
		Self {
			signing_key,
			token_validity_hours: DEFAULT_TOKEN_VALIDITY_HOURS,
			rate_limit: RateLimitConfig::default(),
			test_bypass: None,
		}
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(document);
		let config: Self = serde_path_to_error::deserialize(&mut deserializer)?;

		config.validate()?;

		Ok(config)
	}

	/// Overrides the credential validity window.
	pub fn with_token_validity_hours(mut self, hours: u32) -> Self {
		self.token_validity_hours = hours;

		self
	}

	/// Overrides the throttling parameters.
	pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
		self.rate_limit = rate_limit;

		self
	}

	/// Enables the test bypass credential.
	pub fn with_test_bypass(mut self, credential: impl Into<String>) -> Self {
		self.test_bypass = Some(credential.into());

		self
	}

	/// Checks every field for values the admission layer cannot operate with.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.signing_key.is_empty() {
			return Err(ConfigError::EmptySigningKey);
		}
		if self.token_validity_hours == 0 {
			return Err(ConfigError::ZeroTokenValidity);
		}
		if self.token_validity_hours > MAX_TOKEN_VALIDITY_HOURS {
			return Err(ConfigError::TokenValidityTooLong { max: MAX_TOKEN_VALIDITY_HOURS });
		}
		if self.test_bypass.as_deref().is_some_and(|credential| credential.trim().is_empty()) {
			return Err(ConfigError::EmptyBypassCredential);
		}

		self.rate_limit.validate()
	}

	/// Credential validity as a duration.
	pub fn token_validity(&self) -> Duration {
		Duration::hours(i64::from(self.token_validity_hours))
	}
}

/// Token-bucket parameters applied to every identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
	/// Bucket capacity (and burst size).
	#[serde(default = "default_capacity")]
	pub capacity: u32,
	/// Milliseconds needed to accrue one token.
	#[serde(default = "default_refill_interval_ms")]
	pub refill_interval_ms: u64,
	/// Milliseconds of inactivity after which an entry may be evicted; unset keeps entries
	/// forever.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub idle_ttl_ms: Option<u64>,
}
impl RateLimitConfig {
	/// Creates a configuration for the given capacity and per-token refill interval.
	///
	/// Sub-millisecond precision is truncated.
	pub fn new(capacity: u32, refill_interval: Duration) -> Self {
		Self {
			capacity,
			refill_interval_ms: duration_to_ms(refill_interval),
			idle_ttl_ms: None,
		}
	}

	/// Enables idle-entry eviction.
	pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
		self.idle_ttl_ms = Some(duration_to_ms(ttl));

		self
	}

	/// Checks the bucket shape.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.bucket_settings().validate()?;

		if self.idle_ttl_ms == Some(0) {
			return Err(ConfigError::NonPositiveIdleTtl);
		}

		Ok(())
	}

	/// Bucket shape for the registry.
	pub fn bucket_settings(&self) -> BucketSettings {
		BucketSettings::new(self.capacity, ms_to_duration(self.refill_interval_ms))
	}

	/// Eviction policy for the registry.
	pub fn eviction_policy(&self) -> EvictionPolicy {
		match self.idle_ttl_ms {
			Some(ms) => EvictionPolicy::IdleFor(ms_to_duration(ms)),
			None => EvictionPolicy::Never,
		}
	}
}
impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			capacity: DEFAULT_CAPACITY,
			refill_interval_ms: DEFAULT_REFILL_INTERVAL_MS,
			idle_ttl_ms: None,
		}
	}
}

fn default_token_validity_hours() -> u32 {
	DEFAULT_TOKEN_VALIDITY_HOURS
}

fn default_capacity() -> u32 {
	DEFAULT_CAPACITY
}

fn default_refill_interval_ms() -> u64 {
	DEFAULT_REFILL_INTERVAL_MS
}

fn duration_to_ms(duration: Duration) -> u64 {
	u64::try_from(duration.whole_milliseconds()).unwrap_or(0)
}

fn ms_to_duration(ms: u64) -> Duration {
	Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_fill_missing_fields() {
		let config = AdmissionConfig::from_json_str(r#"{"signing_key":"k1"}"#)
			.expect("Minimal configuration should parse.");

		assert_eq!(config.token_validity(), Duration::hours(72));
		assert_eq!(config.rate_limit, RateLimitConfig::default());
		assert_eq!(
			config.rate_limit.bucket_settings(),
			BucketSettings::new(10, Duration::minutes(1))
		);
		assert_eq!(config.rate_limit.eviction_policy(), EvictionPolicy::Never);
		assert!(config.test_bypass.is_none());
	}

	#[test]
	fn parse_errors_carry_the_field_path() {
		let err = AdmissionConfig::from_json_str(
			r#"{"signing_key":"k1","rate_limit":{"capacity":"ten"}}"#,
		)
		.expect_err("Non-numeric capacity must be rejected.");

		match err {
			ConfigError::Parse { path, .. } => assert_eq!(path, "rate_limit.capacity"),
			other => panic!("Expected a parse error, got {other:?}."),
		}
	}

	#[test]
	fn invalid_values_are_rejected() {
		assert!(matches!(
			AdmissionConfig::from_json_str(r#"{"signing_key":""}"#),
			Err(ConfigError::EmptySigningKey)
		));
		assert!(matches!(
			AdmissionConfig::from_json_str(r#"{"signing_key":"k","token_validity_hours":0}"#),
			Err(ConfigError::ZeroTokenValidity)
		));
		assert!(matches!(
			AdmissionConfig::from_json_str(r#"{"signing_key":"k","rate_limit":{"capacity":0}}"#),
			Err(ConfigError::ZeroCapacity)
		));
		assert!(matches!(
			AdmissionConfig::from_json_str(
				r#"{"signing_key":"k","rate_limit":{"refill_interval_ms":0}}"#
			),
			Err(ConfigError::NonPositiveRefillInterval)
		));
		assert!(matches!(
			AdmissionConfig::from_json_str(r#"{"signing_key":"k","test_bypass":" "}"#),
			Err(ConfigError::EmptyBypassCredential)
		));
	}

	#[test]
	fn oversized_validity_is_rejected_at_startup() {
		assert!(matches!(
			AdmissionConfig::from_json_str(
				r#"{"signing_key":"k","token_validity_hours":100000000}"#
			),
			Err(ConfigError::TokenValidityTooLong { max: MAX_TOKEN_VALIDITY_HOURS })
		));

		let config = AdmissionConfig::new(SigningKey::new("k"))
			.with_token_validity_hours(MAX_TOKEN_VALIDITY_HOURS);

		config.validate().expect("Validity at the bound should be accepted.");
	}

	#[test]
	fn per_second_refill_and_eviction_round_trip() {
		let rate_limit =
			RateLimitConfig::new(5, Duration::seconds(1)).with_idle_ttl(Duration::hours(1));

		assert_eq!(rate_limit.refill_interval_ms, 1_000);
		assert_eq!(rate_limit.eviction_policy(), EvictionPolicy::IdleFor(Duration::hours(1)));
	}
}
