//! Protocol-layer flow messages and the stores that carry them between
//! requests.
//!
//! The authorize endpoint persists a [`SignInMessage`] under a random flow
//! id before redirecting the browser here; the logout machinery does the
//! same with a [`SignOutMessage`]. A [`MessageStore`] is the capability for
//! reading them back: the production backend is [`CookieMessageStore`]
//! (one signed cookie per flow id, so concurrent flows in one browser never
//! interfere), and [`InMemoryMessageStore`] exists for in-process tests and
//! hosts with their own distribution story.

use axum_extra::extract::CookieJar;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

mod cookie;
pub use cookie::CookieMessageStore;

mod memory;
pub use memory::InMemoryMessageStore;

/// Type alias with a default `Err` type of [`Error`].
///
/// [`Error`]: enum@Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The errors that can occur when reading or writing flow messages.
#[derive(Debug, Error)]
pub enum Error
{
	/// The message could not be (de)serialized.
	#[error("failed to serialize message")]
	Serialize(#[from] serde_json::Error),

	/// The stored envelope names a different flow id than the one it was
	/// looked up under. This only happens when cookies were tampered with
	/// or misrouted; the flow cannot continue.
	#[error("message is bound to a different flow")]
	FlowMismatch,
}

/// A flow message that can be parked in a [`MessageStore`].
pub trait Message: Serialize + DeserializeOwned + Send + Sync
{
	/// Short kind tag; keeps the cookies of different message types apart.
	const KIND: &'static str;
}

/// Describes an in-progress authorize request.
///
/// Created by the protocol layer, immutable for the life of a flow, and
/// consumed here. Every field the user never typed is trusted; everything
/// else was validated upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInMessage
{
	/// The client that initiated the authorize request, if one is bound.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_id: Option<String>,

	/// Where to send the browser once sign-in completes.
	pub return_url: Url,

	/// An external provider requested by the client (`idp` hint). When set
	/// and eligible, the login page is skipped entirely.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub identity_provider: Option<String>,

	/// Username to prefill on the login page.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub login_hint: Option<String>,

	/// Requested authentication context class references, passed through
	/// to the user service untouched.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub acr_values: Vec<String>,

	/// Tenant the request was made under, passed through to the user
	/// service untouched.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tenant: Option<String>,
}

impl SignInMessage
{
	/// Creates a message with just a client and a return URL; the rest is
	/// optional protocol sugar.
	pub fn new(client_id: impl Into<String>, return_url: Url) -> Self
	{
		Self {
			client_id: Some(client_id.into()),
			return_url,
			identity_provider: None,
			login_hint: None,
			acr_values: Vec::new(),
			tenant: None,
		}
	}
}

impl Message for SignInMessage
{
	const KIND: &'static str = "signin";
}

/// Describes an in-progress logout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignOutMessage
{
	/// The client that initiated the logout, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_id: Option<String>,

	/// Where the logged-out page should offer to send the browser.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub return_url: Option<Url>,
}

impl Message for SignOutMessage
{
	const KIND: &'static str = "signout";
}

/// Capability for parking a flow message between requests.
///
/// Implementations are addressed by flow id: two flows never observe each
/// other's messages, and reading an id the store has no message for yields
/// `Ok(None)`. The cookie jar threads through because the production
/// backend keeps all of its state in the browser.
pub trait MessageStore<T>: Send + Sync
where
	T: Message,
{
	/// Stores `message` under `id`.
	fn put(&self, cookies: CookieJar, id: &str, message: &T) -> Result<CookieJar>;

	/// Reads the message stored under `id`, if any.
	fn read(&self, cookies: &CookieJar, id: &str) -> Result<Option<T>>;

	/// Removes the message stored under `id`. Clearing an absent id is a
	/// no-op.
	fn clear(&self, cookies: CookieJar, id: &str) -> CookieJar;
}
