//! Observability for admission decisions.
//!
//! # Feature Flags
//!
//! - `tracing` (default) opens one `request_admission.admit` span per request. The span records
//!   the resolved `user_id` once authentication passes and the final `outcome` (`admitted` or an
//!   error kind label). Stage rejections are logged at `debug`, internal failures at `error`.
//! - `metrics` increments `request_admission_stage_total`, labeled by `stage` + `outcome`.

// self
use crate::{_prelude::*, auth::UserId};

/// Outcome label written to the request span when the chain admits a request.
pub const ADMITTED: &str = "admitted";

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedAdmission<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedAdmission<F> = F;

/// Positions in the admission chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdmissionStage {
	/// Credential verification.
	Authenticate,
	/// Per-identity token-bucket check.
	RateLimit,
	/// Downstream collaborator invoked after admission.
	Downstream,
}
impl AdmissionStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AdmissionStage::Authenticate => "authenticate",
			AdmissionStage::RateLimit => "rate_limit",
			AdmissionStage::Downstream => "downstream",
		}
	}
}

/// How a single stage treated the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// The stage passed the request on.
	Pass,
	/// Routine refusal: unauthenticated, throttled, or invalid input.
	Reject,
	/// Internal failure.
	Failure,
}
impl StageOutcome {
	/// Classifies a stage result.
	pub fn of(result: Result<(), &Error>) -> Self {
		match result {
			Ok(()) => StageOutcome::Pass,
			Err(e) if e.kind() == crate::error::ErrorKind::Internal => StageOutcome::Failure,
			Err(_) => StageOutcome::Reject,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Pass => "pass",
			StageOutcome::Reject => "reject",
			StageOutcome::Failure => "failure",
		}
	}
}

/// Span covering one request from credential check to downstream response.
#[derive(Clone, Debug)]
pub struct AdmissionSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl AdmissionSpan {
	/// Opens a span with empty `user_id` and `outcome` fields.
	pub fn new() -> Self {
		Self {
			#[cfg(feature = "tracing")]
			span: tracing::debug_span!(
				"request_admission.admit",
				user_id = tracing::field::Empty,
				outcome = tracing::field::Empty
			),
		}
	}

	/// Records the identity the request was authenticated as.
	pub fn record_identity(&self, id: &UserId) {
		#[cfg(feature = "tracing")]
		self.span.record("user_id", tracing::field::display(id));
		#[cfg(not(feature = "tracing"))]
		let _ = id;
	}

	/// Records the final admission outcome.
	pub fn record_outcome(&self, outcome: &'static str) {
		#[cfg(feature = "tracing")]
		self.span.record("outcome", outcome);
		#[cfg(not(feature = "tracing"))]
		let _ = outcome;
	}

	/// Runs `f` with the span entered.
	pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
		#[cfg(feature = "tracing")]
		{
			self.span.in_scope(f)
		}
		#[cfg(not(feature = "tracing"))]
		{
			f()
		}
	}

	/// Instruments the downstream future without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedAdmission<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
impl Default for AdmissionSpan {
	fn default() -> Self {
		Self::new()
	}
}

/// Counts and logs the result of one stage.
///
/// Internal failures are logged at `error` with their diagnostic, which never reaches the
/// response; every other refusal is routine and logged at `debug`.
pub fn record_stage(stage: AdmissionStage, result: Result<(), &Error>) {
	let outcome = StageOutcome::of(result);

	#[cfg(feature = "metrics")]
	metrics::counter!(
		"request_admission_stage_total",
		"stage" => stage.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);

	#[cfg(feature = "tracing")]
	match result {
		Err(error) if outcome == StageOutcome::Failure => {
			tracing::error!(stage = stage.as_str(), error = %error, "admission stage failed");
		},
		Err(error) => {
			tracing::debug!(
				stage = stage.as_str(),
				kind = error.kind().as_str(),
				detail = ?error,
				"request rejected"
			);
		},
		Ok(()) => tracing::trace!(stage = stage.as_str(), "stage passed"),
	}

	#[cfg(not(any(feature = "metrics", feature = "tracing")))]
	let _ = (stage, outcome);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::AuthError;

	#[test]
	fn outcomes_classify_by_error_kind() {
		assert_eq!(StageOutcome::of(Ok(())), StageOutcome::Pass);
		assert_eq!(StageOutcome::of(Err(&Error::RateLimited)), StageOutcome::Reject);
		assert_eq!(StageOutcome::of(Err(&AuthError::Expired.into())), StageOutcome::Reject);
		assert_eq!(StageOutcome::of(Err(&Error::validation("x"))), StageOutcome::Reject);
		assert_eq!(StageOutcome::of(Err(&Error::internal("boom"))), StageOutcome::Failure);
	}

	#[test]
	fn record_stage_accepts_every_result() {
		record_stage(AdmissionStage::Authenticate, Ok(()));
		record_stage(AdmissionStage::RateLimit, Err(&Error::RateLimited));
		record_stage(AdmissionStage::Downstream, Err(&Error::internal("boom")));
	}

	#[test]
	fn span_records_fields_inside_scope() {
		let span = AdmissionSpan::new();
		let id = UserId::new("u1").expect("User fixture should be valid.");
		let value = span.in_scope(|| {
			span.record_identity(&id);
			span.record_outcome(ADMITTED);

			7
		});

		assert_eq!(value, 7);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let value = AdmissionSpan::new().instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
