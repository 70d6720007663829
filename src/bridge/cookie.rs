//! The browser-cookie [`HostAuthBridge`] backend.

use std::sync::Arc;

use axum_extra::extract::cookie::Key;
use axum_extra::extract::CookieJar;

use super::{ChallengeProperties, ExternalProvider, HostAuthBridge, Result, SignInProperties};
use crate::claims::ClaimsPrincipal;
use crate::config::CookieConfig;
use crate::cookies::seal;

/// Name of the cookie stashing pending [`ChallengeProperties`].
const CHALLENGE_COOKIE: &str = "idsrv.challenge";

/// Holds scheme identities and pending challenge state in signed cookies,
/// one cookie per scheme, named after the scheme itself.
#[derive(Clone)]
pub struct CookieHostBridge
{
	/// Signing key for identity and challenge cookies.
	key: Key,

	/// Shared cookie field settings.
	config: Arc<CookieConfig>,

	/// External providers configured on the host.
	providers: Vec<ExternalProvider>,
}

impl CookieHostBridge
{
	/// Creates a new [`CookieHostBridge`].
	pub fn new(
		key: Key,
		config: impl Into<Arc<CookieConfig>>,
		providers: Vec<ExternalProvider>,
	) -> Self
	{
		Self { key, config: config.into(), providers }
	}
}

impl std::fmt::Debug for CookieHostBridge
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		f.debug_struct("CookieHostBridge")
			.field("providers", &self.providers)
			.finish_non_exhaustive()
	}
}

impl HostAuthBridge for CookieHostBridge
{
	fn external_providers(&self) -> Vec<ExternalProvider>
	{
		self.providers.clone()
	}

	#[tracing::instrument(level = "debug", skip(self, cookies))]
	fn challenge(&self, cookies: CookieJar, properties: &ChallengeProperties)
		-> Result<CookieJar>
	{
		let cookie = self
			.config
			.build_cookie(CHALLENGE_COOKIE, seal::encode(properties)?)
			.max_age(self.config.message_max_age)
			.build();

		Ok(cookies.add(seal::sign(&self.key, cookie)))
	}

	fn take_challenge_properties(&self, cookies: CookieJar)
		-> (CookieJar, Option<ChallengeProperties>)
	{
		let properties = cookies
			.get(CHALLENGE_COOKIE)
			.and_then(|cookie| seal::verify(&self.key, cookie))
			.and_then(|value| seal::decode(&value));

		(cookies.add(self.config.removal(CHALLENGE_COOKIE)), properties)
	}

	#[tracing::instrument(level = "debug", skip(self, cookies, principal), fields(
		subject = principal.subject(),
	))]
	fn sign_in(
		&self,
		cookies: CookieJar,
		scheme: &str,
		principal: &ClaimsPrincipal,
		properties: &SignInProperties,
	) -> Result<CookieJar>
	{
		let mut builder = self
			.config
			.build_cookie(scheme.to_owned(), seal::encode(principal)?);

		if properties.persistent {
			builder = match properties.expires {
				Some(expires) => builder.expires(expires),
				None => builder.max_age(self.config.max_age),
			};
		}

		Ok(cookies.add(seal::sign(&self.key, builder.build())))
	}

	fn sign_out(&self, cookies: CookieJar, schemes: &[&str]) -> CookieJar
	{
		schemes.iter().fold(cookies, |cookies, &scheme| {
			cookies.add(self.config.removal(scheme.to_owned()))
		})
	}

	fn identity(&self, cookies: &CookieJar, scheme: &str) -> Option<ClaimsPrincipal>
	{
		cookies
			.get(scheme)
			.filter(|cookie| !cookie.value().is_empty())
			.and_then(|cookie| seal::verify(&self.key, cookie))
			.and_then(|value| seal::decode(&value))
	}
}
