//! Page rendering.
//!
//! The flow controller assembles view models; a host-supplied
//! [`ViewService`] turns them into HTML. Templating is deliberately out of
//! scope here — the models carry everything a template needs and nothing
//! else.

use axum::async_trait;
use axum::response::Html;
use url::Url;

/// Type alias with a default `Err` type of [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A failure inside a view service.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Error(Box<dyn std::error::Error + Send + Sync>);

impl Error
{
	/// Wraps an arbitrary failure.
	pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self
	{
		Self(source.into())
	}
}

/// A link rendered on the login page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LoginPageLink
{
	/// Link text.
	pub text: String,

	/// Link target. `{signin}` is replaced with the current flow id before
	/// rendering.
	pub href: String,
}

/// The anti-forgery token a page must echo back in its form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntiForgeryToken
{
	/// The form field name to submit the token under.
	pub name: String,

	/// The token value.
	pub value: String,
}

/// Everything the login page needs.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginViewModel
{
	/// Correlation id of the request being rendered, if the host assigned
	/// one.
	pub request_id: Option<String>,

	/// Site branding.
	pub site_name: String,

	/// Site branding link target.
	pub site_url: Url,

	/// Error text to show, if the previous attempt failed.
	pub error_message: Option<String>,

	/// Where the login form posts to. `None` when local login is not
	/// available for this flow, in which case no form is rendered.
	pub login_url: Option<String>,

	/// Token the form must echo. Present iff [`login_url`] is.
	///
	/// [`login_url`]: LoginViewModel::login_url
	pub anti_forgery: Option<AntiForgeryToken>,

	/// Whether to offer the "remember me" checkbox.
	pub allow_remember_me: bool,

	/// The checkbox's current value.
	pub remember_me: bool,

	/// Username to prefill.
	pub username: Option<String>,

	/// Links to the eligible external providers, in configuration order.
	pub external_providers: Vec<LoginPageLink>,

	/// Additional host-configured links (registration, password reset, …).
	pub additional_links: Vec<LoginPageLink>,

	/// Display name of the currently signed-in user, if any.
	pub current_user: Option<String>,
}

/// Everything the logout prompt page needs.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoutViewModel
{
	/// Correlation id of the request being rendered.
	pub request_id: Option<String>,

	/// Site branding.
	pub site_name: String,

	/// Site branding link target.
	pub site_url: Url,

	/// Where the confirmation form posts to.
	pub logout_url: String,

	/// Token the form must echo.
	pub anti_forgery: AntiForgeryToken,

	/// Name of the client that asked for the logout, if one did.
	pub client_name: Option<String>,

	/// Display name of the user being signed out.
	pub current_user: Option<String>,
}

/// Everything the logged-out page needs.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedOutViewModel
{
	/// Correlation id of the request being rendered.
	pub request_id: Option<String>,

	/// Site branding.
	pub site_name: String,

	/// Site branding link target.
	pub site_url: Url,

	/// Front-channel sign-out notification URLs, rendered as hidden
	/// iframes.
	pub iframe_urls: Vec<Url>,

	/// Name of the client to offer a return link for.
	pub client_name: Option<String>,

	/// The client's post-logout return URL.
	pub redirect_url: Option<Url>,
}

/// Everything the generic error page needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorViewModel
{
	/// Correlation id of the request being rendered.
	pub request_id: Option<String>,

	/// Site branding.
	pub site_name: String,

	/// Site branding link target.
	pub site_url: Url,

	/// The error text. Always a controller- or user-service-originated
	/// message; request data is never echoed here.
	pub error_message: String,
}

/// Renders view models into HTML.
#[async_trait]
pub trait ViewService: Send + Sync
{
	/// Renders the login page.
	async fn login(&self, model: &LoginViewModel) -> Result<Html<String>>;

	/// Renders the logout confirmation prompt.
	async fn logout(&self, model: &LogoutViewModel) -> Result<Html<String>>;

	/// Renders the logged-out page.
	async fn logged_out(&self, model: &LoggedOutViewModel) -> Result<Html<String>>;

	/// Renders the generic error page.
	async fn error(&self, model: &ErrorViewModel) -> Result<Html<String>>;
}

/// Supplies the front-channel sign-out notification URLs for the
/// logged-out page.
///
/// The real implementation lives with the protocol endpoints, which know
/// which clients participate in front-channel logout; [`NoSignOutUrls`] is
/// the default for hosts without one.
pub trait SignOutUrlSource: Send + Sync
{
	/// The URLs to render as hidden iframes, given the session being
	/// ended.
	fn iframe_urls(&self, session_id: Option<&str>) -> Vec<Url>;
}

/// A [`SignOutUrlSource`] for hosts without front-channel logout.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignOutUrls;

impl SignOutUrlSource for NoSignOutUrls
{
	fn iframe_urls(&self, _session_id: Option<&str>) -> Vec<Url>
	{
		Vec::new()
	}
}
