//! The browser-cookie [`MessageStore`] backend.

use std::sync::Arc;

use axum_extra::extract::cookie::Key;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use super::{Error, Message, MessageStore, Result};
use crate::config::CookieConfig;
use crate::cookies::seal;

/// Stores flow messages as signed cookies, one cookie per flow id.
///
/// The payload is a JSON envelope that repeats the flow id; a cookie that
/// verifies but names a different id than it was looked up under is
/// rejected, so a message can never leak into another flow even if cookie
/// names are rewritten in transit.
#[derive(Clone)]
pub struct CookieMessageStore
{
	/// Signing key for the envelope.
	key: Key,

	/// Shared cookie field settings.
	config: Arc<CookieConfig>,
}

impl CookieMessageStore
{
	/// Creates a new [`CookieMessageStore`].
	pub fn new(key: Key, config: impl Into<Arc<CookieConfig>>) -> Self
	{
		Self { key, config: config.into() }
	}

	/// The cookie name carrying the message of kind `KIND` for `id`.
	fn cookie_name<T>(id: &str) -> String
	where
		T: Message,
	{
		format!("idsrv.{}.{id}", T::KIND)
	}
}

impl std::fmt::Debug for CookieMessageStore
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		f.debug_struct("CookieMessageStore").finish_non_exhaustive()
	}
}

/// What actually goes into the cookie value.
#[derive(Serialize, Deserialize)]
#[allow(clippy::missing_docs_in_private_items)]
struct Envelope
{
	id: String,

	#[serde(flatten)]
	message: serde_json::Value,
}

impl<T> MessageStore<T> for CookieMessageStore
where
	T: Message,
{
	fn put(&self, cookies: CookieJar, id: &str, message: &T) -> Result<CookieJar>
	{
		let envelope = Envelope {
			id: id.to_owned(),
			message: serde_json::to_value(message)?,
		};

		let cookie = self
			.config
			.build_cookie(Self::cookie_name::<T>(id), seal::encode(&envelope)?)
			.max_age(self.config.message_max_age)
			.build();

		Ok(cookies.add(seal::sign(&self.key, cookie)))
	}

	fn read(&self, cookies: &CookieJar, id: &str) -> Result<Option<T>>
	{
		let Some(cookie) = cookies.get(&Self::cookie_name::<T>(id)) else {
			return Ok(None);
		};

		let Some(value) = seal::verify(&self.key, cookie) else {
			tracing::debug!(flow.id = %id, "message cookie failed verification");
			return Ok(None);
		};

		let Some(envelope) = seal::decode::<Envelope>(&value) else {
			tracing::debug!(flow.id = %id, "message cookie envelope is malformed");
			return Ok(None);
		};

		if envelope.id != id {
			return Err(Error::FlowMismatch);
		}

		Ok(Some(serde_json::from_value(envelope.message)?))
	}

	fn clear(&self, cookies: CookieJar, id: &str) -> CookieJar
	{
		cookies.add(self.config.removal(Self::cookie_name::<T>(id)))
	}
}

#[cfg(test)]
mod tests
{
	use cookie::Cookie;
	use url::Url;

	use super::*;
	use crate::messages::SignInMessage;

	fn store() -> CookieMessageStore
	{
		CookieMessageStore::new(Key::generate(), CookieConfig::default())
	}

	fn message() -> SignInMessage
	{
		SignInMessage::new("c1", Url::parse("https://rp/cb").unwrap())
	}

	#[test]
	fn messages_round_trip()
	{
		let store = store();
		let cookies = store.put(CookieJar::new(), "abc", &message()).unwrap();

		let read: Option<SignInMessage> = store.read(&cookies, "abc").unwrap();

		assert_eq!(read, Some(message()));
	}

	#[test]
	fn flows_are_isolated_by_id()
	{
		let store = store();
		let cookies = store.put(CookieJar::new(), "abc", &message()).unwrap();

		let read: Option<SignInMessage> = store.read(&cookies, "xyz").unwrap();

		assert_eq!(read, None);
	}

	#[test]
	fn renamed_cookies_are_rejected()
	{
		let store = store();
		let cookies = store.put(CookieJar::new(), "abc", &message()).unwrap();

		// Move the sealed value of flow `abc` under flow `xyz`'s name.
		let sealed = cookies.get("idsrv.signin.abc").unwrap().value().to_owned();
		let forged = CookieJar::new().add(Cookie::new("idsrv.signin.xyz", sealed));

		let read: Result<Option<SignInMessage>> = store.read(&forged, "xyz");

		assert!(matches!(read, Err(Error::FlowMismatch)));
	}

	#[test]
	fn tampered_cookies_read_as_absent()
	{
		let store = store();
		let cookies = store.put(CookieJar::new(), "abc", &message()).unwrap();

		let mut tampered = cookies.get("idsrv.signin.abc").unwrap().value().to_owned();
		tampered.push('x');
		let forged = CookieJar::new().add(Cookie::new("idsrv.signin.abc", tampered));

		let read: Option<SignInMessage> = store.read(&forged, "abc").unwrap();

		assert_eq!(read, None);
	}

	#[test]
	fn clear_writes_a_removal_cookie()
	{
		let store = store();
		let cookies = store.put(CookieJar::new(), "abc", &message()).unwrap();
		let cookies = MessageStore::<SignInMessage>::clear(&store, cookies, "abc");

		let cookie = cookies.get("idsrv.signin.abc").unwrap();

		assert_eq!(cookie.value(), "");
	}
}
