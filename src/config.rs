//! Configuration for the authentication endpoint.

use std::borrow::Cow;

use cookie::{Cookie, CookieBuilder, SameSite};
use time::OffsetDateTime;
use url::Url;

use crate::services::views::LoginPageLink;

/// Behavioral options for the authentication endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AuthOptions
{
	/// The public URL this subsystem is reachable at, including the
	/// identity server's base path. Used to build provider links, resume
	/// URLs, and to resolve `~/` partial-login redirect paths.
	pub public_url: Url,

	/// Name shown on the rendered pages.
	pub site_name: String,

	/// Link target for the site name on the rendered pages.
	pub site_url: Url,

	/// Whether username/password login is available at all. When `false`,
	/// `POST /login` answers 405 and the login page only offers external
	/// providers.
	pub enable_local_login: bool,

	/// Whether `GET /logout` shows a confirmation prompt. When `false`,
	/// sign-out happens immediately.
	pub enable_sign_out_prompt: bool,

	/// Whether the sign-in message's login hint may prefill the username
	/// field.
	pub enable_login_hint: bool,

	/// Whether the login page offers a "remember me" checkbox. When
	/// `false` the user is never prompted and the server-side persistence
	/// default applies.
	pub allow_remember_me: bool,

	/// How long the primary authentication cookie lives when the user
	/// checked "remember me".
	#[serde(deserialize_with = "deserialize_duration")]
	pub remember_me_duration: time::Duration,

	/// Whether authentication cookies are persistent by default, i.e. when
	/// the user was never asked about remembering them.
	pub persistent_cookies: bool,

	/// Extra links rendered on the login page (registration, password
	/// reset, …). `{signin}` in an href is replaced with the flow id.
	pub login_page_links: Vec<LoginPageLink>,
}

impl Default for AuthOptions
{
	fn default() -> Self
	{
		Self {
			public_url: default_public_url(),
			site_name: default_site_name(),
			site_url: default_public_url(),
			enable_local_login: true,
			enable_sign_out_prompt: true,
			enable_login_hint: true,
			allow_remember_me: true,
			remember_me_duration: default_remember_me_duration(),
			persistent_cookies: false,
			login_page_links: Vec::new(),
		}
	}
}

#[allow(clippy::missing_docs_in_private_items)]
fn default_public_url() -> Url
{
	Url::parse("https://localhost").expect("hard-coded URL should be valid")
}

#[allow(clippy::missing_docs_in_private_items)]
fn default_site_name() -> String
{
	String::from("Identity Server")
}

#[allow(clippy::missing_docs_in_private_items)]
fn default_remember_me_duration() -> time::Duration
{
	time::Duration::days(30)
}

/// Settings shared by every cookie this subsystem writes.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CookieConfig
{
	/// The [`Domain`] field.
	///
	/// [`Domain`]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Set-Cookie#domaindomain-value
	pub domain: Option<String>,

	/// The [`Path`] field. This should cover the identity server's base
	/// path and nothing more.
	///
	/// [`Path`]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Set-Cookie#pathpath-value
	pub path: String,

	/// Whether to set the `Secure` flag.
	pub secure: bool,

	/// How long flow message cookies (pending sign-in / sign-out
	/// requests) live, in seconds. These are short-lived by design; a flow
	/// that has not finished within this window starts over.
	#[serde(deserialize_with = "deserialize_duration")]
	pub message_max_age: time::Duration,

	/// How long the last-username convenience cookie lives, in seconds.
	#[serde(deserialize_with = "deserialize_duration")]
	pub max_age: time::Duration,
}

impl CookieConfig
{
	/// Builds a cookie with this configuration's shared fields applied.
	///
	/// All cookies written here are host-only state, so `HttpOnly` is
	/// unconditional and `SameSite=Lax` keeps them on top-level
	/// navigations from external providers.
	pub fn build_cookie<'a>(
		&self,
		name: impl Into<Cow<'a, str>>,
		value: impl Into<Cow<'a, str>>,
	) -> CookieBuilder<'a>
	{
		let builder = Cookie::build((name, value))
			.path(self.path.clone())
			.http_only(true)
			.same_site(SameSite::Lax)
			.secure(self.secure);

		match self.domain.clone() {
			Some(domain) => builder.domain(domain),
			None => builder,
		}
	}

	/// Builds a removal cookie: same addressing fields, empty value,
	/// expiry in the past.
	pub fn removal<'a>(&self, name: impl Into<Cow<'a, str>>) -> Cookie<'a>
	{
		self.build_cookie(name, "")
			.expires(OffsetDateTime::UNIX_EPOCH)
			.build()
	}
}

impl Default for CookieConfig
{
	fn default() -> Self
	{
		Self {
			domain: None,
			path: String::from("/"),
			secure: true,
			message_max_age: default_message_max_age(),
			max_age: default_max_age(),
		}
	}
}

#[allow(clippy::missing_docs_in_private_items)]
fn default_message_max_age() -> time::Duration
{
	time::Duration::hours(1)
}

#[allow(clippy::missing_docs_in_private_items)]
fn default_max_age() -> time::Duration
{
	time::Duration::days(30)
}

#[allow(clippy::missing_docs_in_private_items)]
fn deserialize_duration<'de, D>(deserializer: D) -> Result<time::Duration, D::Error>
where
	D: serde::Deserializer<'de>,
{
	<i64 as serde::Deserialize<'de>>::deserialize(deserializer).map(time::Duration::seconds)
}
