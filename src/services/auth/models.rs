//! Request / response types for the authentication routes.

use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::CookieJar;
use http::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::http::fallback_error_page;

/// Query parameters identifying a sign-in flow.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SignInQuery
{
	/// The flow id assigned by the authorize endpoint.
	pub signin: Option<String>,
}

/// Query parameters for starting an external login.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExternalQuery
{
	/// The flow id assigned by the authorize endpoint.
	pub signin: Option<String>,

	/// The external provider to challenge.
	pub provider: Option<String>,
}

/// Query parameters an external provider may append to the callback.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery
{
	/// An error token reported by the provider instead of an identity.
	pub error: Option<String>,
}

/// Query parameters identifying a suspended sign-in.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResumeQuery
{
	/// The continuation id handed out when the sign-in was suspended.
	pub resume: Option<String>,
}

/// Query parameters identifying a logout flow.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogoutQuery
{
	/// The flow id assigned by the endpoint that initiated the logout.
	pub id: Option<String>,
}

/// The login form body.
///
/// Every field is optional at the HTTP level; the flow controller decides
/// what absence means (and the anti-forgery check runs first regardless).
#[derive(Debug, Deserialize)]
pub struct LoginForm
{
	/// The submitted username.
	pub username: Option<String>,

	/// The submitted password.
	pub password: Option<String>,

	/// The "remember me" checkbox, when the page offered one.
	pub remember_me: Option<bool>,

	/// The anti-forgery token echoed from the rendered form.
	pub xsrf: Option<String>,
}

/// The logout confirmation form body.
#[derive(Debug, Deserialize)]
pub struct LogoutForm
{
	/// The anti-forgery token echoed from the rendered form.
	pub xsrf: Option<String>,
}

/// What a flow operation hands back to the browser.
///
/// Every variant that carries a jar flushes it into the response, which is
/// how cookie mutations reach the browser; error paths deliberately carry
/// no jar so nothing gets written.
#[derive(Debug)]
pub enum FlowResponse
{
	/// A rendered page.
	Page
	{
		/// Cookie mutations to flush.
		cookies: CookieJar,

		/// The rendered HTML.
		html: Html<String>,
	},

	/// A rendered page without cookie mutations, for error paths.
	ErrorPage
	{
		/// The rendered HTML.
		html: Html<String>,
	},

	/// A `302 Found` redirect.
	Redirect
	{
		/// Cookie mutations to flush.
		cookies: CookieJar,

		/// Where to send the browser.
		location: Url,
	},

	/// A `401` that the host's federated authentication middleware
	/// rewrites into the provider-specific redirect.
	Challenge
	{
		/// Cookie mutations to flush (the stashed challenge properties).
		cookies: CookieJar,
	},

	/// A bare status code with the fallback page body.
	Status(StatusCode),
}

impl IntoResponse for FlowResponse
{
	fn into_response(self) -> Response
	{
		match self {
			Self::Page { cookies, html } => (StatusCode::OK, cookies, html).into_response(),
			Self::ErrorPage { html } => (StatusCode::OK, html).into_response(),
			Self::Redirect { cookies, location } => (
				StatusCode::FOUND,
				cookies,
				[(http::header::LOCATION, location.to_string())],
			)
				.into_response(),
			Self::Challenge { cookies } => {
				(StatusCode::UNAUTHORIZED, cookies).into_response()
			},
			Self::Status(status) => fallback_error_page(status),
		}
	}
}
