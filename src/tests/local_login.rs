use cookie::Cookie;
use http::StatusCode;
use time::OffsetDateTime;

use super::{base_options, body_string, location, send, sign_in_message};
use crate::claims::{ClaimsPrincipal, BUILT_IN_IDENTITY_PROVIDER};
use crate::services::clients::Client;
use crate::services::events::Event;
use crate::services::users::AuthenticateResult;
use crate::testing::{harness, Browser, StubUserService};

fn alice() -> ClaimsPrincipal
{
	ClaimsPrincipal::authenticated("alice-id", "alice", "password", BUILT_IN_IDENTITY_PROVIDER)
}

#[tokio::test]
async fn happy_local_login()
{
	let server = harness()
		.options(base_options())
		.client(Client::new("c1", "Client One"))
		.users(StubUserService::new().local_with(AuthenticateResult::full(alice())))
		.build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	browser.set("idsrv.xsrf", "t0ken");

	let response = send(
		&server.router,
		browser.post(
			"/login?signin=abc",
			"username=alice&password=pw&remember_me=true&xsrf=t0ken",
		),
	)
	.await;

	assert_eq!(response.status(), StatusCode::FOUND);
	assert_eq!(location(&response), "https://rp/cb");

	// The primary cookie is persistent with an explicit expiry close to
	// now + the remember-me duration.
	let primary = response
		.headers()
		.get_all(http::header::SET_COOKIE)
		.into_iter()
		.map(|value| Cookie::parse_encoded(value.to_str().unwrap().to_owned()).unwrap())
		.find(|cookie| cookie.name() == "idsrv.primary" && !cookie.value().is_empty())
		.expect("a primary cookie should be issued");
	let expires = primary.expires_datetime().expect("cookie should be persistent");
	let expected = OffsetDateTime::now_utc() + time::Duration::days(30);
	assert!((expires - expected).abs() < time::Duration::hours(1));

	browser.apply(&response);

	assert!(!browser.has("idsrv.signin.abc"), "the flow's message must be consumed");
	assert_eq!(browser.cookie("idsrv.username"), Some("alice"));
	assert!(browser.has("idsrv.session"));
	assert!(browser.has("idsrv.primary"));

	assert!(matches!(
		server.events.events().as_slice(),
		[Event::LocalLoginSuccess { username, .. }] if username == "alice",
	));
}

#[tokio::test]
async fn credentials_are_trimmed_before_validation()
{
	let server = harness()
		.options(base_options())
		.users(StubUserService::new().local_with(AuthenticateResult::full(alice())))
		.build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	browser.set("idsrv.xsrf", "t");

	let response = send(
		&server.router,
		browser.post("/login?signin=abc", "username=++alice++&password=pw&xsrf=t"),
	)
	.await;

	assert_eq!(response.status(), StatusCode::FOUND);
	assert_eq!(server.users.local_attempts(), vec![(String::from("alice"), String::from("pw"))]);
}

#[tokio::test]
async fn rejected_credentials_rerender_with_the_generic_message()
{
	let server = harness().options(base_options()).build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	browser.set("idsrv.xsrf", "t");

	let response = send(
		&server.router,
		browser.post("/login?signin=abc", "username=alice&password=wrong&xsrf=t"),
	)
	.await;

	assert_eq!(response.status(), StatusCode::OK);

	let events = server.events.events();
	assert!(matches!(
		events.as_slice(),
		[Event::LocalLoginFailure { username, message: None, .. }] if username == "alice",
	));

	let body = body_string(response).await;
	assert!(body.contains(r#"data-page="login""#));
	assert!(body.contains(r#"data-error="Invalid username or password""#));
	assert!(body.contains(r#"data-username="alice""#), "the submitted username is preserved");
}

#[tokio::test]
async fn typed_user_service_errors_are_shown_verbatim()
{
	let server = harness()
		.options(base_options())
		.users(StubUserService::new().local_with(AuthenticateResult::error("Account locked")))
		.build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	browser.set("idsrv.xsrf", "t");

	let response = send(
		&server.router,
		browser.post("/login?signin=abc", "username=alice&password=pw&xsrf=t"),
	)
	.await;

	let body = body_string(response).await;
	assert!(body.contains(r#"data-error="Account locked""#));

	assert!(matches!(
		server.events.events().as_slice(),
		[Event::LocalLoginFailure { message: Some(message), .. }] if message == "Account locked",
	));
}

#[tokio::test]
async fn blank_fields_rerender_with_field_errors()
{
	let server = harness().options(base_options()).build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	browser.set("idsrv.xsrf", "t");

	let response = send(
		&server.router,
		browser.post("/login?signin=abc", "username=+&password=pw&xsrf=t"),
	)
	.await;
	let body = body_string(response).await;
	assert!(body.contains(r#"data-error="Username is required""#));

	let response = send(
		&server.router,
		browser.post("/login?signin=abc", "username=alice&password=+&remember_me=true&xsrf=t"),
	)
	.await;
	let body = body_string(response).await;
	assert!(body.contains(r#"data-error="Password is required""#));
	assert!(body.contains(r#"data-username="alice""#));
	assert!(body.contains(r#"data-remember-me="true""#));

	assert_eq!(server.users.calls(), 0, "no user-service call for blank fields");
}

#[tokio::test]
async fn missing_credentials_rerender_with_the_generic_message()
{
	let server = harness().options(base_options()).build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	browser.set("idsrv.xsrf", "t");

	let response = send(&server.router, browser.post("/login?signin=abc", "xsrf=t")).await;

	let body = body_string(response).await;
	assert!(body.contains(r#"data-error="Invalid username or password""#));
	assert_eq!(server.users.calls(), 0);
}

#[tokio::test]
async fn post_is_rejected_when_local_login_is_disabled()
{
	let options = crate::config::AuthOptions { enable_local_login: false, ..base_options() };
	let server = harness().options(options).build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	browser.set("idsrv.xsrf", "t");

	let response = send(
		&server.router,
		browser.post("/login?signin=abc", "username=alice&password=pw&xsrf=t"),
	)
	.await;

	assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(server.users.calls(), 0);
}

#[tokio::test]
async fn post_is_rejected_when_the_client_disables_local_login()
{
	let mut client = Client::new("c1", "Client One");
	client.enable_local_login = false;

	let server = harness().options(base_options()).client(client).build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	browser.set("idsrv.xsrf", "t");

	let response = send(
		&server.router,
		browser.post("/login?signin=abc", "username=alice&password=pw&xsrf=t"),
	)
	.await;

	assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(server.users.calls(), 0);
}

#[tokio::test]
async fn login_page_prefers_the_login_hint_over_the_remembered_username()
{
	let server = harness().options(base_options()).build_server();

	let mut message = sign_in_message();
	message.login_hint = Some(String::from("hint@example.com"));

	let mut browser = Browser::new();
	browser.set("idsrv.username", "bob");
	server.park_sign_in(&mut browser, "abc", &message);

	let response = send(&server.router, browser.get("/login?signin=abc")).await;
	let body = body_string(response).await;

	assert!(body.contains(r#"data-username="hint@example.com""#));
}

#[tokio::test]
async fn login_page_falls_back_to_the_remembered_username()
{
	let options = crate::config::AuthOptions { enable_login_hint: false, ..base_options() };
	let server = harness().options(options).build_server();

	let mut message = sign_in_message();
	message.login_hint = Some(String::from("hint@example.com"));

	let mut browser = Browser::new();
	browser.set("idsrv.username", "bob");
	server.park_sign_in(&mut browser, "abc", &message);

	let response = send(&server.router, browser.get("/login?signin=abc")).await;
	let body = body_string(response).await;

	assert!(body.contains(r#"data-username="bob""#), "hint is off, the cookie wins");
}

#[tokio::test]
async fn unknown_flows_render_the_no_sign_in_error()
{
	let server = harness().options(base_options()).build_server();

	let response = send(&server.router, Browser::new().get("/login?signin=abc")).await;

	assert_eq!(response.status(), StatusCode::OK);

	let body = body_string(response).await;
	assert!(body.contains(r#"data-page="error""#));
	assert!(body.contains("no longer a sign-in request pending"));
}

#[tokio::test]
async fn pre_authentication_can_short_circuit_the_flow()
{
	let server = harness()
		.options(base_options())
		.users(StubUserService::new().pre_authenticate_with(AuthenticateResult::full(alice())))
		.build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());

	let response = send(&server.router, browser.get("/login?signin=abc")).await;

	assert_eq!(response.status(), StatusCode::FOUND);
	assert_eq!(location(&response), "https://rp/cb");
	assert!(matches!(
		server.events.events().as_slice(),
		[Event::PreLoginSuccess { sign_in_id, .. }] if sign_in_id == "abc",
	));
}

#[tokio::test]
async fn pre_authentication_errors_render_the_error_page()
{
	let server = harness()
		.options(base_options())
		.users(StubUserService::new().pre_authenticate_with(AuthenticateResult::error("Denied")))
		.build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());

	let response = send(&server.router, browser.get("/login?signin=abc")).await;
	let body = body_string(response).await;

	assert!(body.contains(r#"data-page="error""#));
	assert!(body.contains(r#"data-message="Denied""#));
	assert!(matches!(
		server.events.events().as_slice(),
		[Event::PreLoginFailure { message, .. }] if message == "Denied",
	));
}
