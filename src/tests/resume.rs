use http::StatusCode;

use super::{base_options, body_string, location, send, sign_in_message, BASE};
use crate::bridge::{schemes, ExternalProvider, HostAuthBridge};
use crate::claims::{claim_types, Claim, ClaimsPrincipal};
use crate::services::events::Event;
use crate::services::users::AuthenticateResult;
use crate::testing::{harness, Browser, StubUserService};

/// A suspended principal for continuation `R` of flow `abc`, as the flow
/// controller would have parked it, carrying `extra` claims on top of the
/// bookkeeping set.
fn parked_principal(extra: Vec<Claim>) -> ClaimsPrincipal
{
	let mut claims = vec![
		Claim::with_issuer(claim_types::SUBJECT, "goog-123", "goog"),
		Claim::new(
			claim_types::PARTIAL_LOGIN_RETURN_URL,
			format!("{BASE}/resume?resume=R"),
		),
		Claim::with_issuer(claim_types::EXTERNAL_PROVIDER_USER_ID, "goog-123", "goog"),
		Claim::new(claim_types::partial_login_resume_id("R"), "abc"),
	];
	claims.extend(extra);

	ClaimsPrincipal::new(claims)
}

/// The extra claims that, together with the subject, complete the full
/// sign-in claim set.
fn completing_claims() -> Vec<Claim>
{
	vec![
		Claim::new(claim_types::NAME, "alice"),
		Claim::new(claim_types::AUTHENTICATION_METHOD, "external"),
		Claim::new(claim_types::AUTHENTICATION_TIME, "1700000000"),
		Claim::new(claim_types::IDENTITY_PROVIDER, "goog"),
	]
}

#[tokio::test]
async fn complete_partials_are_promoted_without_the_bookkeeping_claims()
{
	let server = harness().options(base_options()).build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	server.seed_identity(&mut browser, schemes::PARTIAL, &parked_principal(completing_claims()));

	let response = send(&server.router, browser.get("/resume?resume=R")).await;

	assert_eq!(response.status(), StatusCode::FOUND);
	assert_eq!(location(&response), "https://rp/cb");

	browser.apply(&response);

	assert!(!browser.has("idsrv.signin.abc"), "promotion consumes the flow's message");
	assert!(!browser.has(schemes::PARTIAL));
	assert!(browser.has("idsrv.session"));

	let primary = server
		.bridge
		.identity(&browser.jar(), schemes::PRIMARY)
		.expect("a primary identity should be issued");

	assert!(!primary.has_claim_type(claim_types::PARTIAL_LOGIN_RETURN_URL));
	assert!(!primary.has_claim_type(claim_types::EXTERNAL_PROVIDER_USER_ID));
	assert!(!primary.has_claim_type(&claim_types::partial_login_resume_id("R")));
	assert_eq!(primary.subject(), Some("goog-123"));

	assert!(matches!(
		server.events.events().as_slice(),
		[Event::PartialLoginComplete { resume_id, .. }] if resume_id == "R",
	));
	assert_eq!(server.users.calls(), 0, "a complete principal needs no re-authentication");
}

#[tokio::test]
async fn incomplete_partials_re_run_external_authentication()
{
	let full = ClaimsPrincipal::authenticated("alice-id", "alice", "external", "goog");
	let server = harness()
		.options(base_options())
		.provider(ExternalProvider::new("goog", "Google"))
		.users(StubUserService::new().external_with(AuthenticateResult::full(full)))
		.build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	server.seed_identity(&mut browser, schemes::PARTIAL, &parked_principal(Vec::new()));

	let response = send(&server.router, browser.get("/resume?resume=R")).await;

	assert_eq!(response.status(), StatusCode::FOUND);
	assert_eq!(location(&response), "https://rp/cb");
	assert_eq!(server.users.calls(), 1);

	assert!(matches!(
		server.events.events().as_slice(),
		[Event::ExternalLoginSuccess { provider, provider_id, sign_in_id }]
			if provider == "goog" && provider_id == "goog-123" && sign_in_id == "abc",
	));
}

#[tokio::test]
async fn resume_without_a_partial_sign_in_is_a_dead_end()
{
	let server = harness().options(base_options()).build_server();

	let response = send(&server.router, Browser::new().get("/resume?resume=R")).await;

	assert_eq!(response.status(), StatusCode::OK);

	let body = body_string(response).await;
	assert!(body.contains(r#"data-page="error""#));
}

#[tokio::test]
async fn resume_with_a_foreign_continuation_id_is_a_dead_end()
{
	let server = harness().options(base_options()).build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	server.seed_identity(&mut browser, schemes::PARTIAL, &parked_principal(completing_claims()));

	// The browser holds a continuation named `R`; asking for `S` must not
	// resume anything.
	let response = send(&server.router, browser.get("/resume?resume=S")).await;

	browser.apply(&response);

	let body = body_string(response).await;
	assert!(body.contains(r#"data-page="error""#));

	assert!(
		browser.has("idsrv.signin.abc"),
		"a failed resume leaves the flow untouched",
	);
}
