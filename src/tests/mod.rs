//! End-to-end tests driving the full router with a cookie-carrying fake
//! browser, scripted collaborators, and real (signed-cookie) stores.

use axum::body::Body;
use axum::Router;
use http::{header, Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;
use url::Url;

use crate::config::AuthOptions;
use crate::messages::SignInMessage;

mod local_login;
mod resume;
mod validation;

/// The public base URL every test mounts the subsystem at.
pub(crate) const BASE: &str = "https://idsvr.test";

/// Options pointing at [`BASE`].
pub(crate) fn base_options() -> AuthOptions
{
	AuthOptions {
		public_url: Url::parse(BASE).expect("base url is valid"),
		..AuthOptions::default()
	}
}

/// The standard pending sign-in used across scenarios: client `c1`,
/// returning to `https://rp/cb`.
pub(crate) fn sign_in_message() -> SignInMessage
{
	SignInMessage::new("c1", Url::parse("https://rp/cb").expect("url is valid"))
}

/// Sends one request through the router.
pub(crate) async fn send(router: &Router, request: Request<Body>) -> Response<Body>
{
	router
		.clone()
		.oneshot(request)
		.await
		.expect("router is infallible")
}

/// Reads a response body to a string.
pub(crate) async fn body_string(response: Response<Body>) -> String
{
	let bytes = response
		.into_body()
		.collect()
		.await
		.expect("body should collect")
		.to_bytes();

	String::from_utf8(bytes.to_vec()).expect("pages are utf-8")
}

/// The `Location` header of a redirect.
pub(crate) fn location(response: &Response<Body>) -> &str
{
	response
		.headers()
		.get(header::LOCATION)
		.expect("response should be a redirect")
		.to_str()
		.expect("location is ascii")
}

/// Whether the response set any cookie at all.
pub(crate) fn sets_cookies(response: &Response<Body>) -> bool
{
	response.headers().contains_key(header::SET_COOKIE)
}
