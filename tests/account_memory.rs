// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use time::Duration;
// self
use request_admission::{
	account::{AccountService, InsertOutcome, MemoryDirectory, UserDirectory},
	admission::AdmissionChain,
	auth::{AuthError, SigningKey},
	config::AdmissionConfig,
	context::ScopeExt,
	error::{Error, ErrorKind},
	http::{HeaderValue, Request, header::AUTHORIZATION},
};

const SIGNING_KEY: &str = "k1";

fn build_service() -> (AccountService, MemoryDirectory) {
	let directory = MemoryDirectory::default();
	let service = AccountService::with_key(
		Arc::new(directory.clone()),
		SigningKey::new(SIGNING_KEY),
		Duration::hours(72),
	);

	(service, directory)
}

#[tokio::test]
async fn signup_then_login_passes_admission() -> Result<()> {
	let (service, directory) = build_service();
	let signup_token = service.signup("demo", "pass").await?;
	let login_token = service.login("demo", "pass").await?;

	assert_eq!(directory.len(), 1);

	let chain = AdmissionChain::from_config(&AdmissionConfig::new(SigningKey::new(SIGNING_KEY)))?;

	for token in [signup_token, login_token] {
		let request = Request::builder()
			.header(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?)
			.body(())?;
		let admitted = chain.admit(request)?;

		assert_eq!(admitted.scope().and_then(|scope| scope.username()), Some("demo"));
	}

	assert_eq!(chain.registry().len(), 1, "Both tokens belong to the same identity.");

	Ok(())
}

#[tokio::test]
async fn login_rejects_unknown_users_and_wrong_passwords() {
	let (service, _) = build_service();

	service.signup("demo", "pass").await.expect("Signup fixture should succeed.");

	for (username, password) in [("unknown", "bad"), ("demo", "bad"), ("demo", "")] {
		let err = service
			.login(username, password)
			.await
			.expect_err("Invalid credentials must be rejected.");

		assert!(matches!(err, Error::Unauthenticated(AuthError::InvalidCredentials)));
		assert_eq!(err.kind(), ErrorKind::Unauthenticated);
	}
}

#[tokio::test]
async fn signup_validates_input_and_uniqueness() {
	let (service, directory) = build_service();

	for (username, password) in [("", "pass"), ("demo", "")] {
		let err = service
			.signup(username, password)
			.await
			.expect_err("Empty credentials must be rejected.");

		assert_eq!(err.kind(), ErrorKind::ValidationFailed);
	}

	service.signup("demo", "pass").await.expect("First signup should succeed.");

	let err = service
		.signup("demo", "other")
		.await
		.expect_err("Duplicate username must be rejected.");

	assert_eq!(err.kind(), ErrorKind::ValidationFailed);
	assert_eq!(directory.len(), 1);
}

#[tokio::test]
async fn directory_insert_is_first_writer_wins() {
	let (service, directory) = build_service();

	service.signup("demo", "pass").await.expect("Signup fixture should succeed.");

	let existing = directory
		.find_by_name("demo")
		.await
		.expect("Lookup should succeed.")
		.expect("Registered user should be present.");
	let outcome = directory.insert(existing).await.expect("Insert should succeed.");

	assert_eq!(outcome, InsertOutcome::NameTaken);
	assert!(directory.find_by_name("nobody").await.expect("Lookup should succeed.").is_none());
}
