//! The host authentication bridge.
//!
//! The identity server runs inside a host that owns the actual
//! authentication machinery: named cookie schemes, and the
//! challenge/callback handshake with external identity providers. The flow
//! controller only ever talks to that machinery through the narrow
//! [`HostAuthBridge`] capability, which is what makes the whole subsystem
//! testable in-process without a real federated host.
//!
//! The production backend is [`CookieHostBridge`]; tests and embedded
//! hosts can use [`InMemoryHostBridge`].

use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use url::Url;

use crate::claims::ClaimsPrincipal;

mod cookie;
pub use cookie::CookieHostBridge;

mod memory;
pub use memory::{BridgeOp, InMemoryHostBridge};

/// Type alias with a default `Err` type of [`Error`].
///
/// [`Error`]: enum@Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The errors that can occur when talking to the host bridge.
#[derive(Debug, Error)]
pub enum Error
{
	/// A principal or challenge could not be (de)serialized.
	#[error("failed to serialize identity")]
	Serialize(#[from] serde_json::Error),
}

/// The named authentication schemes this subsystem issues identities
/// under.
pub mod schemes
{
	/// The fully signed-in identity.
	pub const PRIMARY: &str = "idsrv.primary";

	/// The identity captured from an external provider's callback, before
	/// the user service has seen it.
	pub const EXTERNAL: &str = "idsrv.external";

	/// A suspended (partial) sign-in awaiting resumption.
	pub const PARTIAL: &str = "idsrv.partial";

	/// All three, in clearing order.
	pub const ALL: [&str; 3] = [PRIMARY, EXTERNAL, PARTIAL];
}

/// An external identity provider configured on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProvider
{
	/// Scheme name, used in URLs and as a claim issuer.
	pub name: String,

	/// Name shown on the login page.
	pub display_name: String,

	/// Whether the provider is listed on the login page. Invisible
	/// providers can still be requested explicitly via the `idp` hint.
	pub visible: bool,
}

impl ExternalProvider
{
	/// Creates a visible provider.
	pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self
	{
		Self {
			name: name.into(),
			display_name: display_name.into(),
			visible: true,
		}
	}
}

/// State attached to an external challenge.
///
/// These survive the round-trip through the external provider so the
/// callback, which otherwise has no context, can recover the originating
/// flow and the provider it challenged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeProperties
{
	/// The originating sign-in flow.
	pub sign_in_id: String,

	/// The provider scheme that was challenged.
	pub provider: String,

	/// Where the provider should send the browser back to.
	pub redirect_uri: Url,
}

/// How to persist an identity cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInProperties
{
	/// Whether the cookie survives the browser session.
	pub persistent: bool,

	/// Explicit expiry; only meaningful for persistent cookies.
	pub expires: Option<OffsetDateTime>,
}

impl SignInProperties
{
	/// A session-scoped (non-persistent) sign-in.
	pub fn session() -> Self
	{
		Self { persistent: false, expires: None }
	}
}

/// Capability over the host's cookie authentication machinery.
///
/// The cookie jar threads through every mutating call because the
/// production backend keeps all of its state in the browser; a call's
/// returned jar must replace the caller's.
pub trait HostAuthBridge: Send + Sync
{
	/// The external providers configured on the host.
	fn external_providers(&self) -> Vec<ExternalProvider>;

	/// Whether `name` is a configured provider scheme.
	fn has_provider(&self, name: &str) -> bool
	{
		self.external_providers()
			.iter()
			.any(|provider| provider.name == name)
	}

	/// Initiates a challenge to the provider named in `properties`,
	/// stashing the properties for the callback. The HTTP response that
	/// triggers the provider redirect is the caller's job (a 401 the host
	/// rewrites).
	fn challenge(&self, cookies: CookieJar, properties: &ChallengeProperties)
		-> Result<CookieJar>;

	/// Recovers and consumes the properties stashed by [`challenge`].
	///
	/// [`challenge`]: HostAuthBridge::challenge
	fn take_challenge_properties(&self, cookies: CookieJar)
		-> (CookieJar, Option<ChallengeProperties>);

	/// Issues `principal` under `scheme`.
	fn sign_in(
		&self,
		cookies: CookieJar,
		scheme: &str,
		principal: &ClaimsPrincipal,
		properties: &SignInProperties,
	) -> Result<CookieJar>;

	/// Clears the identities held under the given schemes. Unknown
	/// schemes are ignored.
	fn sign_out(&self, cookies: CookieJar, schemes: &[&str]) -> CookieJar;

	/// The identity currently held under `scheme`, if any.
	fn identity(&self, cookies: &CookieJar, scheme: &str) -> Option<ClaimsPrincipal>;
}
