//! Ordered admission pipeline run once per inbound request.
//!
//! The chain verifies the credential, attaches the resolved identity to a fresh
//! [`RequestScope`], and consumes one token from the identity's bucket. The first failing stage
//! short-circuits the request; nothing is retried here. All stages are synchronous, so a
//! request that is cancelled while awaiting its downstream handler has either been fully
//! admitted (one token consumed, scope attached) or not touched the registry at all.

pub mod metrics;

pub use metrics::AdmissionMetrics;

// self
use crate::{
	_prelude::*,
	auth::{Identity, TokenVerifier},
	config::AdmissionConfig,
	context::RequestScope,
	error::{ConfigError, ErrorKind},
	limiter::RateLimiterRegistry,
	obs::{self, AdmissionSpan, AdmissionStage},
};

const RATE_LIMITED_BODY: &str = "Too many requests";
const BAD_REQUEST_BODY: &str = "Bad request";
const INTERNAL_BODY: &str = "Internal server error";

/// Per-request admission state.
///
/// `Start -> {Authenticated, Rejected} -> {Admitted, Rejected}`; `Admitted` and `Rejected` are
/// terminal.
#[derive(Debug)]
pub enum AdmissionState {
	/// Nothing has been checked yet.
	Start,
	/// The credential verified and produced this identity.
	Authenticated(Identity),
	/// The identity had a token available; the scope is ready for downstream handlers.
	Admitted(RequestScope),
	/// A stage refused the request.
	Rejected(Error),
}
impl AdmissionState {
	/// Returns `true` for `Admitted` and `Rejected`.
	pub fn is_terminal(&self) -> bool {
		matches!(self, AdmissionState::Admitted(_) | AdmissionState::Rejected(_))
	}
}

/// Terminal refusal produced by the chain or by a downstream collaborator.
#[derive(Debug, ThisError)]
#[error("{error}")]
pub struct Rejection {
	/// Underlying error; only its kind is disclosed to the caller.
	#[source]
	pub error: Error,
}
impl Rejection {
	/// Externally visible kind.
	pub fn kind(&self) -> ErrorKind {
		self.error.kind()
	}

	/// HTTP status reported to the caller.
	pub fn status(&self) -> http::StatusCode {
		self.kind().status()
	}

	/// Renders the response written for this rejection.
	///
	/// Unauthenticated requests get an empty body and rate-limited ones `Too many requests`;
	/// other kinds get a generic body without internal detail.
	pub fn into_response(self) -> http::Response<String> {
		let body = match self.kind() {
			ErrorKind::Unauthenticated => String::new(),
			ErrorKind::RateLimited => RATE_LIMITED_BODY.into(),
			ErrorKind::ValidationFailed => BAD_REQUEST_BODY.into(),
			ErrorKind::Internal => INTERNAL_BODY.into(),
		};
		let mut response = http::Response::new(body);

		*response.status_mut() = self.status();

		response
	}
}
impl From<Error> for Rejection {
	fn from(error: Error) -> Self {
		Self { error }
	}
}

/// Token verifier, identity attachment, and rate limiter composed into one pipeline.
///
/// Clones share the same registry and counters, so one chain can be handed to every worker.
#[derive(Clone, Debug)]
pub struct AdmissionChain {
	verifier: Arc<TokenVerifier>,
	registry: Arc<RateLimiterRegistry>,
	/// Shared counters for admission decisions.
	pub metrics: Arc<AdmissionMetrics>,
}
impl AdmissionChain {
	/// Creates a chain from an explicit verifier and registry handle.
	pub fn new(verifier: TokenVerifier, registry: Arc<RateLimiterRegistry>) -> Self {
		Self { verifier: Arc::new(verifier), registry, metrics: Default::default() }
	}

	/// Builds the verifier and registry described by a validated configuration.
	pub fn from_config(config: &AdmissionConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		let mut verifier = TokenVerifier::new(config.signing_key.clone());

		if let Some(credential) = &config.test_bypass {
			verifier = verifier.with_test_bypass(credential.clone());
		}

		let registry = RateLimiterRegistry::new(config.rate_limit.bucket_settings())
			.with_eviction(config.rate_limit.eviction_policy());

		Ok(Self::new(verifier, Arc::new(registry)))
	}

	/// Verifier used by the first stage.
	pub fn verifier(&self) -> &TokenVerifier {
		&self.verifier
	}

	/// Registry shared by every clone of this chain.
	pub fn registry(&self) -> &Arc<RateLimiterRegistry> {
		&self.registry
	}

	/// Advances `state` by one stage at the provided instant.
	pub fn step_at(
		&self,
		state: AdmissionState,
		headers: &http::HeaderMap,
		now: OffsetDateTime,
	) -> AdmissionState {
		match state {
			AdmissionState::Start => match self.authenticate(headers, now) {
				Ok(identity) => AdmissionState::Authenticated(identity),
				Err(e) => AdmissionState::Rejected(e),
			},
			AdmissionState::Authenticated(identity) => {
				let scope = RequestScope::new().attach(identity);

				match self.throttle(&scope, now) {
					Ok(()) => AdmissionState::Admitted(scope),
					Err(e) => AdmissionState::Rejected(e),
				}
			},
			terminal => terminal,
		}
	}

	/// Runs every stage against `headers` and returns the admitted scope.
	pub fn evaluate_at(
		&self,
		headers: &http::HeaderMap,
		now: OffsetDateTime,
	) -> Result<RequestScope> {
		self.evaluate_in(&AdmissionSpan::new(), headers, now)
	}

	/// Admits `request` at the current instant.
	pub fn admit<B>(&self, request: http::Request<B>) -> Result<http::Request<B>, Rejection> {
		self.admit_at(request, OffsetDateTime::now_utc())
	}

	/// Admits `request` at the provided instant, inserting its [`RequestScope`] into the request
	/// extensions on success.
	pub fn admit_at<B>(
		&self,
		request: http::Request<B>,
		now: OffsetDateTime,
	) -> Result<http::Request<B>, Rejection> {
		self.admit_in(&AdmissionSpan::new(), request, now)
	}

	/// Admits `request` and forwards it to `downstream`, turning every failure into a response.
	///
	/// Errors returned by `downstream` (for example [`Error::Validation`]) pass through the same
	/// rendering as admission rejections but are not counted in [`AdmissionMetrics`].
	pub async fn serve<B, F, Fut>(
		&self,
		request: http::Request<B>,
		downstream: F,
	) -> http::Response<String>
	where
		F: FnOnce(http::Request<B>) -> Fut,
		Fut: Future<Output = Result<http::Response<String>>>,
	{
		let span = AdmissionSpan::new();
		let request = match self.admit_in(&span, request, OffsetDateTime::now_utc()) {
			Ok(request) => request,
			Err(rejection) => return rejection.into_response(),
		};

		match span.instrument(downstream(request)).await {
			Ok(response) => {
				obs::record_stage(AdmissionStage::Downstream, Ok(()));

				response
			},
			Err(e) => {
				obs::record_stage(AdmissionStage::Downstream, Err(&e));

				Rejection::from(e).into_response()
			},
		}
	}

	fn admit_in<B>(
		&self,
		span: &AdmissionSpan,
		mut request: http::Request<B>,
		now: OffsetDateTime,
	) -> Result<http::Request<B>, Rejection> {
		let scope = self.evaluate_in(span, request.headers(), now)?;

		request.extensions_mut().insert(scope);

		Ok(request)
	}

	fn evaluate_in(
		&self,
		span: &AdmissionSpan,
		headers: &http::HeaderMap,
		now: OffsetDateTime,
	) -> Result<RequestScope> {
		span.in_scope(|| {
			let mut state = AdmissionState::Start;

			loop {
				state = match self.step_at(state, headers, now) {
					AdmissionState::Authenticated(identity) => {
						span.record_identity(identity.id());

						AdmissionState::Authenticated(identity)
					},
					AdmissionState::Admitted(scope) => {
						self.metrics.record_admitted();
						span.record_outcome(obs::ADMITTED);

						return Ok(scope);
					},
					AdmissionState::Rejected(e) => {
						span.record_outcome(e.kind().as_str());

						return Err(e);
					},
					next => next,
				};
			}
		})
	}

	fn authenticate(&self, headers: &http::HeaderMap, now: OffsetDateTime) -> Result<Identity> {
		let result = self.verifier.verify_header_at(headers, now);

		self.record(AdmissionStage::Authenticate, result.as_ref().map(|_| ()));

		result
	}

	fn throttle(&self, scope: &RequestScope, now: OffsetDateTime) -> Result<()> {
		let result = scope.require_identity().and_then(|identity| {
			if self.registry.allow_at(identity.id(), now) {
				Ok(())
			} else {
				Err(Error::RateLimited)
			}
		});

		self.record(AdmissionStage::RateLimit, result.as_ref().copied());

		result
	}

	// Chain stages only; downstream results never touch `self.metrics`.
	fn record(&self, stage: AdmissionStage, result: Result<(), &Error>) {
		if let Err(e) = result {
			match e.kind() {
				ErrorKind::Unauthenticated => self.metrics.record_unauthenticated(),
				ErrorKind::RateLimited => self.metrics.record_rate_limited(),
				ErrorKind::Internal => self.metrics.record_internal(),
				ErrorKind::ValidationFailed => {},
			}
		}

		obs::record_stage(stage, result);
	}
}
