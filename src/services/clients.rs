//! Client metadata lookup.

use std::collections::HashMap;

use axum::async_trait;
use url::Url;

/// Type alias with a default `Err` type of [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An infrastructure failure inside a client store.
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

/// The subset of client metadata the authentication endpoint consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client
{
	/// Unique client identifier.
	pub client_id: String,

	/// Name shown to users.
	pub client_name: String,

	/// Link target for the client name, if the client has a homepage.
	pub client_uri: Option<Url>,

	/// Whether this client permits username/password login at all.
	pub enable_local_login: bool,

	/// External providers this client may use. Empty means all configured
	/// providers are allowed.
	pub identity_provider_restrictions: Vec<String>,
}

impl Client
{
	/// Creates a client with permissive defaults.
	pub fn new(client_id: impl Into<String>, client_name: impl Into<String>) -> Self
	{
		Self {
			client_id: client_id.into(),
			client_name: client_name.into(),
			client_uri: None,
			enable_local_login: true,
			identity_provider_restrictions: Vec::new(),
		}
	}

	/// Whether `provider` is allowed for this client.
	pub fn allows_identity_provider(&self, provider: &str) -> bool
	{
		self.identity_provider_restrictions.is_empty()
			|| self
				.identity_provider_restrictions
				.iter()
				.any(|allowed| allowed == provider)
	}
}

/// Looks up client metadata.
#[async_trait]
pub trait ClientStore: Send + Sync
{
	/// Finds a client by id.
	async fn find_client(&self, client_id: &str) -> Result<Option<Client>>;

	/// Whether `provider` is allowed for `client_id`. Unknown clients
	/// allow nothing.
	async fn is_valid_identity_provider(&self, client_id: &str, provider: &str)
		-> Result<bool>
	{
		Ok(self
			.find_client(client_id)
			.await?
			.is_some_and(|client| client.allows_identity_provider(provider)))
	}
}

/// A fixed set of clients, held in memory.
#[derive(Debug, Default)]
pub struct InMemoryClientStore
{
	/// Clients by id.
	clients: HashMap<String, Client>,
}

impl InMemoryClientStore
{
	/// Creates a store over the given clients.
	pub fn new(clients: impl IntoIterator<Item = Client>) -> Self
	{
		Self {
			clients: clients
				.into_iter()
				.map(|client| (client.client_id.clone(), client))
				.collect(),
		}
	}
}

#[async_trait]
impl ClientStore for InMemoryClientStore
{
	async fn find_client(&self, client_id: &str) -> Result<Option<Client>>
	{
		Ok(self.clients.get(client_id).cloned())
	}
}
