// std
use std::{
	sync::{
		Arc, Barrier,
		atomic::{AtomicUsize, Ordering},
	},
	thread,
};
// crates.io
use time::{Duration, OffsetDateTime, macros};
// self
use request_admission::{
	admission::AdmissionChain,
	auth::{SigningKey, TokenVerifier, UserId},
	http::{HeaderValue, Request, StatusCode, header::AUTHORIZATION},
	limiter::{BucketSettings, RateLimiterRegistry},
};

const CAPACITY: u32 = 10;
const CALLERS: usize = 64;

fn t0() -> OffsetDateTime {
	macros::datetime!(2025-11-10 12:00 UTC)
}

#[test]
fn concurrent_callers_never_exceed_capacity() {
	let registry =
		Arc::new(RateLimiterRegistry::new(BucketSettings::new(CAPACITY, Duration::minutes(1))));
	let key = UserId::new("u1").expect("User fixture should be valid.");
	let barrier = Arc::new(Barrier::new(CALLERS));
	let approvals = Arc::new(AtomicUsize::new(0));
	let handles = (0..CALLERS)
		.map(|_| {
			let (registry, key, barrier, approvals) =
				(registry.clone(), key.clone(), barrier.clone(), approvals.clone());

			thread::spawn(move || {
				barrier.wait();

				if registry.allow_at(&key, t0()) {
					approvals.fetch_add(1, Ordering::SeqCst);
				}
			})
		})
		.collect::<Vec<_>>();

	for handle in handles {
		handle.join().expect("Limiter worker thread should not panic.");
	}

	assert_eq!(approvals.load(Ordering::SeqCst), CAPACITY as usize);
	assert_eq!(registry.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_chain() {
	let registry =
		Arc::new(RateLimiterRegistry::new(BucketSettings::new(CAPACITY, Duration::minutes(1))));
	let chain = AdmissionChain::new(
		TokenVerifier::new(SigningKey::new("k1")).with_test_bypass("TEST"),
		registry,
	);
	let tasks = (0..CALLERS)
		.map(|_| {
			let chain = chain.clone();

			tokio::spawn(async move {
				let request = Request::builder()
					.header(AUTHORIZATION, HeaderValue::from_static("TEST"))
					.body(())
					.expect("Request fixture should build.");

				chain
					.serve(request, |_| async {
						Ok::<_, request_admission::error::Error>(
							request_admission::http::Response::new(String::new()),
						)
					})
					.await
					.status()
			})
		})
		.collect::<Vec<_>>();
	let mut admitted = 0;
	let mut throttled = 0;

	for task in tasks {
		match task.await.expect("Admission task should not panic.") {
			StatusCode::OK => admitted += 1,
			StatusCode::TOO_MANY_REQUESTS => throttled += 1,
			other => panic!("Unexpected status {other}."),
		}
	}

	// Wall-clock time passes between calls, so a slow runner may accrue an extra token.
	assert!(admitted >= CAPACITY as usize && admitted <= CAPACITY as usize + 1);
	assert_eq!(admitted + throttled, CALLERS);
	assert_eq!(chain.metrics.admitted() as usize, admitted);
}
