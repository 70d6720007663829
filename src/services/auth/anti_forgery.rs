//! Double-submit anti-forgery protection for the POST routes.
//!
//! A random token is parked in a cookie and embedded into every rendered
//! form; a POST is only accepted when the form field and the cookie agree.
//! Token derivation beyond "unguessable random value" is deliberately not
//! this crate's business.

use std::sync::Arc;

use axum_extra::extract::CookieJar;
use uuid::Uuid;

use super::error::Error;
use crate::config::CookieConfig;
use crate::services::views::AntiForgeryToken;

/// Name of the cookie half of the token pair.
pub const COOKIE_NAME: &str = "idsrv.xsrf";

/// Name of the form field half of the token pair.
pub const FIELD_NAME: &str = "xsrf";

/// Mints and verifies double-submit tokens.
#[derive(Debug, Clone)]
pub struct AntiForgery
{
	/// Shared cookie field settings.
	config: Arc<CookieConfig>,
}

impl AntiForgery
{
	/// Creates a new [`AntiForgery`].
	pub fn new(config: impl Into<Arc<CookieConfig>>) -> Self
	{
		Self { config: config.into() }
	}

	/// Returns the browser's current token, minting and setting one if it
	/// has none yet. Rendered forms embed the returned token.
	pub fn ensure(&self, cookies: CookieJar) -> (CookieJar, AntiForgeryToken)
	{
		if let Some(value) = existing_token(&cookies) {
			return (cookies, token(value));
		}

		let value = Uuid::new_v4().as_simple().to_string();
		let cookie = self.config.build_cookie(COOKIE_NAME, value.clone()).build();

		(cookies.add(cookie), token(value))
	}

	/// Checks a submitted form token against the cookie. Absence of
	/// either half is a failure.
	pub fn verify(&self, cookies: &CookieJar, submitted: Option<&str>) -> Result<(), Error>
	{
		match (existing_token(cookies), submitted) {
			(Some(expected), Some(submitted)) if expected == submitted => Ok(()),
			_ => Err(Error::AntiForgery),
		}
	}
}

/// The non-empty token currently held by the browser, if any.
fn existing_token(cookies: &CookieJar) -> Option<String>
{
	cookies
		.get(COOKIE_NAME)
		.map(|cookie| cookie.value().to_owned())
		.filter(|value| !value.is_empty())
}

#[allow(clippy::missing_docs_in_private_items)]
fn token(value: String) -> AntiForgeryToken
{
	AntiForgeryToken { name: String::from(FIELD_NAME), value }
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn anti_forgery() -> AntiForgery
	{
		AntiForgery::new(CookieConfig::default())
	}

	#[test]
	fn minted_tokens_verify()
	{
		let xsrf = anti_forgery();
		let (cookies, token) = xsrf.ensure(CookieJar::new());

		assert!(xsrf.verify(&cookies, Some(&token.value)).is_ok());
	}

	#[test]
	fn ensure_is_idempotent()
	{
		let xsrf = anti_forgery();
		let (cookies, first) = xsrf.ensure(CookieJar::new());
		let (_, second) = xsrf.ensure(cookies);

		assert_eq!(first, second);
	}

	#[test]
	fn mismatched_or_missing_tokens_fail()
	{
		let xsrf = anti_forgery();
		let (cookies, _) = xsrf.ensure(CookieJar::new());

		assert!(xsrf.verify(&cookies, Some("wrong")).is_err());
		assert!(xsrf.verify(&cookies, None).is_err());
		assert!(xsrf.verify(&CookieJar::new(), Some("anything")).is_err());
	}
}
