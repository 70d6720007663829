use std::sync::Arc;

use axum_extra::extract::CookieJar;
use cookie::Cookie;
use http::StatusCode;

use super::{base_options, body_string, location, send, sign_in_message, BASE};
use crate::bridge::{BridgeOp, ExternalProvider, HostAuthBridge, InMemoryHostBridge};
use crate::claims::{ClaimsPrincipal, BUILT_IN_IDENTITY_PROVIDER};
use crate::config::CookieConfig;
use crate::messages::{InMemoryMessageStore, MessageStore, SignInMessage, SignOutMessage};
use crate::services::auth::models::LoginForm;
use crate::services::auth::{AuthService, AuthServices, FlowResponse};
use crate::services::clients::InMemoryClientStore;
use crate::services::users::{AuthenticateResult, UserService};
use crate::services::views::NoSignOutUrls;
use crate::testing::{
	harness,
	Browser,
	PlainViewService,
	RecordingEventService,
	StubUserService,
};

fn oversize() -> String
{
	"x".repeat(101)
}

/// Every handler: an oversize parameter yields the generic error page and
/// leaves no other trace — no cookie written, no event, no user-service
/// call.
#[tokio::test]
async fn oversize_parameters_leave_no_trace()
{
	let long = oversize();
	let requests = [
		format!("/login?signin={long}"),
		format!("/external?signin=abc&provider={long}"),
		format!("/external?signin={long}&provider=goog"),
		format!("/resume?resume={long}"),
		format!("/logout?id={long}"),
	];

	for uri in requests {
		let server = harness()
			.options(base_options())
			.provider(ExternalProvider::new("goog", "Google"))
			.build_server();

		let response = send(&server.router, Browser::new().get(&uri)).await;

		assert_eq!(response.status(), StatusCode::OK, "{uri}");
		assert!(!super::sets_cookies(&response), "{uri}: no cookie may be written");
		assert!(server.events.events().is_empty(), "{uri}: no event may be emitted");
		assert_eq!(server.users.calls(), 0, "{uri}: no user-service call may be made");

		let body = body_string(response).await;
		assert!(body.contains(r#"data-page="error""#), "{uri}");
		assert!(!body.contains(&long), "{uri}: the value must not be echoed");
	}
}

#[tokio::test]
async fn oversize_post_parameters_leave_no_trace()
{
	let long = oversize();

	for uri in [format!("/login?signin={long}"), format!("/logout?id={long}")] {
		let server = harness().options(base_options()).build_server();

		let mut browser = Browser::new();
		browser.set("idsrv.xsrf", "t");

		let response = send(&server.router, browser.post(&uri, "xsrf=t")).await;

		assert_eq!(response.status(), StatusCode::OK, "{uri}");
		assert!(!super::sets_cookies(&response), "{uri}");
		assert_eq!(server.users.calls(), 0, "{uri}");
		assert!(server.users.signed_out().is_empty(), "{uri}");
	}
}

/// Oversize credentials are handled more quietly than oversize flow
/// parameters: the login page re-renders with no error text at all.
#[tokio::test]
async fn oversize_credentials_rerender_silently()
{
	let server = harness().options(base_options()).build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());
	browser.set("idsrv.xsrf", "t");

	let long = oversize();
	let response = send(
		&server.router,
		browser.post("/login?signin=abc", &format!("username={long}&password=pw&xsrf=t")),
	)
	.await;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(server.users.calls(), 0);
	assert!(server.events.events().is_empty());

	let body = body_string(response).await;
	assert!(body.contains(r#"data-page="login""#));
	assert!(body.contains(r#"data-error="""#), "no error text is offered to probers");
	assert!(!body.contains(&long));
}

/// POSTs without a matching double-submit token pair are rejected before
/// anything else happens.
#[tokio::test]
async fn anti_forgery_gates_every_post()
{
	let cases: [(&str, Option<&str>); 3] =
		[("missing field", None), ("wrong token", Some("wrong")), ("no cookie", Some("t"))];

	for (label, submitted) in cases {
		let server = harness().options(base_options()).build_server();

		let mut browser = Browser::new();
		server.park_sign_in(&mut browser, "abc", &sign_in_message());

		if label != "no cookie" {
			browser.set("idsrv.xsrf", "t");
		}

		let form = match submitted {
			Some(token) => format!("username=alice&password=pw&xsrf={token}"),
			None => String::from("username=alice&password=pw"),
		};

		let response = send(&server.router, browser.post("/login?signin=abc", &form)).await;

		assert_eq!(response.status(), StatusCode::FORBIDDEN, "{label}");
		assert_eq!(server.users.calls(), 0, "{label}: no user-service call may be made");
		assert!(server.events.events().is_empty(), "{label}");
	}
}

#[tokio::test]
async fn anti_forgery_gates_logout_posts()
{
	let server = harness().options(base_options()).build_server();

	let mut browser = Browser::new();
	server.seed_identity(
		&mut browser,
		crate::bridge::schemes::PRIMARY,
		&ClaimsPrincipal::authenticated("alice-id", "alice", "password", BUILT_IN_IDENTITY_PROVIDER),
	);

	let response = send(&server.router, browser.post("/logout", "")).await;

	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	assert!(!super::sets_cookies(&response), "nothing may be cleared");
	assert!(server.users.signed_out().is_empty());
}

/// Issuance always clears all three schemes first, in one order, before
/// the new identity lands.
#[tokio::test]
async fn schemes_are_cleared_before_issuing()
{
	let bridge = Arc::new(InMemoryHostBridge::new(Vec::new()));
	let messages = Arc::new(InMemoryMessageStore::<SignInMessage>::new());
	let users = Arc::new(
		StubUserService::new().local_with(AuthenticateResult::full(
			ClaimsPrincipal::authenticated(
				"alice-id",
				"alice",
				"password",
				BUILT_IN_IDENTITY_PROVIDER,
			),
		)),
	);

	let svc = AuthService::new(base_options(), CookieConfig::default(), AuthServices {
		users: Arc::clone(&users) as Arc<dyn UserService>,
		clients: Arc::new(InMemoryClientStore::default()),
		views: Arc::new(PlainViewService),
		events: Arc::new(RecordingEventService::new()),
		bridge: Arc::clone(&bridge) as Arc<dyn HostAuthBridge>,
		sign_in_messages: Arc::clone(&messages) as Arc<dyn MessageStore<SignInMessage>>,
		sign_out_messages: Arc::new(InMemoryMessageStore::<SignOutMessage>::new()),
		sign_out_urls: Arc::new(NoSignOutUrls),
	});

	let cookies = messages
		.put(CookieJar::new(), "abc", &sign_in_message())
		.expect("parking the message should succeed")
		.add(Cookie::new("idsrv.xsrf", "t"));

	let form = LoginForm {
		username: Some(String::from("alice")),
		password: Some(String::from("pw")),
		remember_me: None,
		xsrf: Some(String::from("t")),
	};

	let response = svc
		.submit_login(cookies, None, Some("abc"), form)
		.await
		.expect("login should succeed");

	assert!(matches!(response, FlowResponse::Redirect { .. }));

	let ops = bridge.ops();
	let [BridgeOp::SignOut(cleared), BridgeOp::SignIn { scheme, .. }] = ops.as_slice() else {
		panic!("expected exactly clear-then-issue, got {ops:?}");
	};

	assert_eq!(cleared, &["idsrv.primary", "idsrv.external", "idsrv.partial"]);
	assert_eq!(scheme, "idsrv.primary");
}

/// With local login out of the picture, the login page collapses into
/// either a provider redirect or a dead end.
#[tokio::test]
async fn provider_only_login_redirects_or_dead_ends()
{
	let options = || crate::config::AuthOptions { enable_local_login: false, ..base_options() };

	// Exactly one visible provider: straight to it, no page.
	let server = harness()
		.options(options())
		.provider(ExternalProvider::new("goog", "Google"))
		.build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());

	let response = send(&server.router, browser.get("/login?signin=abc")).await;

	assert_eq!(response.status(), StatusCode::FOUND);
	assert_eq!(
		location(&response),
		format!("{BASE}/external?signin=abc&provider=goog"),
	);

	// No providers at all: a dead end.
	let server = harness().options(options()).build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());

	let response = send(&server.router, browser.get("/login?signin=abc")).await;
	let body = body_string(response).await;

	assert!(body.contains(r#"data-page="error""#));
	assert!(body.contains("No sign-in method is available"));

	// Invisible providers do not rescue the page.
	let invisible = ExternalProvider { visible: false, ..ExternalProvider::new("goog", "Google") };
	let server = harness().options(options()).provider(invisible).build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());

	let response = send(&server.router, browser.get("/login?signin=abc")).await;
	let body = body_string(response).await;

	assert!(body.contains(r#"data-page="error""#));
}

/// Two visible providers: the page renders and lists both.
#[tokio::test]
async fn multiple_providers_render_as_links()
{
	let options = crate::config::AuthOptions { enable_local_login: false, ..base_options() };
	let server = harness()
		.options(options)
		.provider(ExternalProvider::new("goog", "Google"))
		.provider(ExternalProvider::new("gh", "GitHub"))
		.build_server();

	let mut browser = Browser::new();
	server.park_sign_in(&mut browser, "abc", &sign_in_message());

	let response = send(&server.router, browser.get("/login?signin=abc")).await;
	let body = body_string(response).await;

	assert!(body.contains(r#"data-page="login""#));
	assert!(body.contains(&format!("{BASE}/external?signin=abc&provider=goog")));
	assert!(body.contains(&format!("{BASE}/external?signin=abc&provider=gh")));
}
