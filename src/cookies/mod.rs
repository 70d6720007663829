//! The small standalone cookies this subsystem owns: the per-session
//! correlation id and the last-username convenience cookie.

use std::fmt;
use std::str::FromStr;

use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::config::CookieConfig;

pub(crate) mod seal;

/// Name of the cookie carrying the [`SessionId`].
pub const SESSION_COOKIE: &str = "idsrv.session";

/// Name of the cookie remembering the last successfully used username.
pub const LAST_USERNAME_COOKIE: &str = "idsrv.username";

/// An opaque identifier minted on each successful sign-in and cleared on
/// sign-out.
///
/// Other endpoints (front-channel logout, check-session) read it to
/// correlate browser state; this subsystem only mints and clears it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SessionId(Uuid);

impl SessionId
{
	/// Generates a new random id.
	pub fn new() -> Self
	{
		Self(Uuid::new_v4())
	}
}

impl Default for SessionId
{
	fn default() -> Self
	{
		Self::new()
	}
}

impl fmt::Display for SessionId
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		fmt::Display::fmt(self.0.as_simple(), f)
	}
}

impl fmt::Debug for SessionId
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_tuple("SessionId").field(self.0.as_simple()).finish()
	}
}

impl FromStr for SessionId
{
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err>
	{
		s.parse::<Uuid>().map(Self)
	}
}

/// Issues a fresh session id, replacing any previous one.
pub fn issue_session_id(config: &CookieConfig, cookies: CookieJar) -> (CookieJar, SessionId)
{
	let session_id = SessionId::new();
	let cookie = config
		.build_cookie(SESSION_COOKIE, session_id.to_string())
		.build();

	(cookies.add(cookie), session_id)
}

/// Clears the session id cookie.
pub fn clear_session_id(config: &CookieConfig, cookies: CookieJar) -> CookieJar
{
	cookies.add(config.removal(SESSION_COOKIE))
}

/// Reads the current session id, if one is present and well-formed.
pub fn session_id(cookies: &CookieJar) -> Option<SessionId>
{
	cookies
		.get(SESSION_COOKIE)
		.and_then(|cookie| cookie.value().parse().ok())
}

/// Reads the remembered username.
pub fn last_username(cookies: &CookieJar) -> Option<String>
{
	cookies
		.get(LAST_USERNAME_COOKIE)
		.map(|cookie| cookie.value().to_owned())
		.filter(|username| !username.is_empty())
}

/// Remembers `username` for prefilling future login pages.
pub fn remember_username(
	config: &CookieConfig,
	cookies: CookieJar,
	username: &str,
) -> CookieJar
{
	let cookie = config
		.build_cookie(LAST_USERNAME_COOKIE, username.to_owned())
		.max_age(config.max_age)
		.build();

	cookies.add(cookie)
}
