//! Signed-cookie envelope helpers shared by the cookie-backed stores.
//!
//! Values are JSON, base64-encoded so they are cookie-safe, and signed with
//! the jar key so the browser can hold them without being trusted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use cookie::{Cookie, Key};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializes a value into a cookie-safe string.
pub(crate) fn encode<T>(value: &T) -> Result<String, serde_json::Error>
where
	T: Serialize,
{
	serde_json::to_vec(value).map(|json| URL_SAFE_NO_PAD.encode(json))
}

/// Reverses [`encode`]. Any malformed input yields `None`.
pub(crate) fn decode<T>(value: &str) -> Option<T>
where
	T: DeserializeOwned,
{
	let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;

	serde_json::from_slice(&bytes).ok()
}

/// Signs a cookie's value, keeping its other fields intact.
pub(crate) fn sign(key: &Key, cookie: Cookie<'static>) -> Cookie<'static>
{
	let name = cookie.name().to_owned();
	let mut jar = cookie::CookieJar::new();

	jar.signed_mut(key).add(cookie);

	jar.get(&name)
		.cloned()
		.expect("cookie was added to the jar above")
}

/// Verifies a signed cookie and returns its original value.
pub(crate) fn verify(key: &Key, cookie: &Cookie<'_>) -> Option<String>
{
	let mut jar = cookie::CookieJar::new();

	jar.add_original(Cookie::new(
		cookie.name().to_owned(),
		cookie.value().to_owned(),
	));

	jar.signed(key)
		.get(cookie.name())
		.map(|verified| verified.value().to_owned())
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn sign_then_verify_returns_the_original_value()
	{
		let key = Key::generate();
		let signed = sign(&key, Cookie::new("idsrv.test", "payload"));

		assert_ne!(signed.value(), "payload");
		assert_eq!(verify(&key, &signed).as_deref(), Some("payload"));
	}

	#[test]
	fn verification_fails_under_a_different_key()
	{
		let signed = sign(&Key::generate(), Cookie::new("idsrv.test", "payload"));

		assert_eq!(verify(&Key::generate(), &signed), None);
	}

	#[test]
	fn encode_decode_round_trips()
	{
		let encoded = encode(&vec![1, 2, 3]).unwrap();

		assert_eq!(decode::<Vec<i32>>(&encoded), Some(vec![1, 2, 3]));
		assert_eq!(decode::<Vec<i32>>("not base64!"), None);
	}
}
