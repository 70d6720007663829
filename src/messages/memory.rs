//! An in-memory [`MessageStore`] backend.

use std::collections::HashMap;
use std::sync::Mutex;

use axum_extra::extract::CookieJar;

use super::{Message, MessageStore, Result};

/// Keeps flow messages in process memory instead of the browser.
///
/// Useful for in-process tests and for hosts that have their own
/// distribution story; note that unlike [`CookieMessageStore`] this ties a
/// flow to a single process.
///
/// [`CookieMessageStore`]: super::CookieMessageStore
#[derive(Debug, Default)]
pub struct InMemoryMessageStore<T>
{
	/// Messages by flow id.
	messages: Mutex<HashMap<String, T>>,
}

impl<T> InMemoryMessageStore<T>
{
	/// Creates an empty store.
	pub fn new() -> Self
	{
		Self { messages: Mutex::new(HashMap::new()) }
	}

	/// How many messages are currently stored.
	pub fn len(&self) -> usize
	{
		self.messages.lock().expect("store lock poisoned").len()
	}

	/// Whether the store holds no messages.
	pub fn is_empty(&self) -> bool
	{
		self.len() == 0
	}
}

impl<T> MessageStore<T> for InMemoryMessageStore<T>
where
	T: Message + Clone,
{
	fn put(&self, cookies: CookieJar, id: &str, message: &T) -> Result<CookieJar>
	{
		self.messages
			.lock()
			.expect("store lock poisoned")
			.insert(id.to_owned(), message.clone());

		Ok(cookies)
	}

	fn read(&self, _cookies: &CookieJar, id: &str) -> Result<Option<T>>
	{
		Ok(self
			.messages
			.lock()
			.expect("store lock poisoned")
			.get(id)
			.cloned())
	}

	fn clear(&self, cookies: CookieJar, id: &str) -> CookieJar
	{
		self.messages
			.lock()
			.expect("store lock poisoned")
			.remove(id);

		cookies
	}
}
