//! An in-memory [`HostAuthBridge`] backend.

use std::collections::HashMap;
use std::sync::Mutex;

use axum_extra::extract::CookieJar;

use super::{ChallengeProperties, ExternalProvider, HostAuthBridge, Result, SignInProperties};
use crate::claims::ClaimsPrincipal;

/// A bridge operation, as recorded by [`InMemoryHostBridge`].
///
/// The log preserves call order, which is what tests of the
/// clear-before-issue discipline care about.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeOp
{
	/// A challenge was initiated.
	Challenge(ChallengeProperties),

	/// An identity was issued under a scheme.
	SignIn
	{
		/// The scheme the identity was issued under.
		scheme: String,

		/// The issued principal.
		principal: ClaimsPrincipal,

		/// Persistence settings.
		properties: SignInProperties,
	},

	/// Schemes were cleared.
	SignOut(Vec<String>),
}

/// Keeps scheme identities and challenge state in process memory.
///
/// Every mutating call is also appended to an operation log so tests can
/// assert on ordering; see [`ops`].
///
/// [`ops`]: InMemoryHostBridge::ops
#[derive(Debug, Default)]
pub struct InMemoryHostBridge
{
	/// External providers configured on the host.
	providers: Vec<ExternalProvider>,

	/// Mutable bridge state.
	state: Mutex<State>,
}

#[derive(Debug, Default)]
#[allow(clippy::missing_docs_in_private_items)]
struct State
{
	identities: HashMap<String, ClaimsPrincipal>,
	challenge: Option<ChallengeProperties>,
	ops: Vec<BridgeOp>,
}

impl InMemoryHostBridge
{
	/// Creates a bridge with the given configured providers.
	pub fn new(providers: Vec<ExternalProvider>) -> Self
	{
		Self { providers, state: Mutex::default() }
	}

	/// Seeds an identity under a scheme, as the host framework would after
	/// an external callback.
	pub fn seed_identity(&self, scheme: &str, principal: ClaimsPrincipal)
	{
		self.lock().identities.insert(scheme.to_owned(), principal);
	}

	/// Seeds pending challenge properties, as a previous challenge would.
	pub fn seed_challenge(&self, properties: ChallengeProperties)
	{
		self.lock().challenge = Some(properties);
	}

	/// The operations performed so far, in order.
	pub fn ops(&self) -> Vec<BridgeOp>
	{
		self.lock().ops.clone()
	}

	#[allow(clippy::missing_docs_in_private_items)]
	fn lock(&self) -> std::sync::MutexGuard<'_, State>
	{
		self.state.lock().expect("bridge lock poisoned")
	}
}

impl HostAuthBridge for InMemoryHostBridge
{
	fn external_providers(&self) -> Vec<ExternalProvider>
	{
		self.providers.clone()
	}

	fn challenge(&self, cookies: CookieJar, properties: &ChallengeProperties)
		-> Result<CookieJar>
	{
		let mut state = self.lock();

		state.challenge = Some(properties.clone());
		state.ops.push(BridgeOp::Challenge(properties.clone()));

		Ok(cookies)
	}

	fn take_challenge_properties(&self, cookies: CookieJar)
		-> (CookieJar, Option<ChallengeProperties>)
	{
		(cookies, self.lock().challenge.take())
	}

	fn sign_in(
		&self,
		cookies: CookieJar,
		scheme: &str,
		principal: &ClaimsPrincipal,
		properties: &SignInProperties,
	) -> Result<CookieJar>
	{
		let mut state = self.lock();

		state
			.identities
			.insert(scheme.to_owned(), principal.clone());
		state.ops.push(BridgeOp::SignIn {
			scheme: scheme.to_owned(),
			principal: principal.clone(),
			properties: properties.clone(),
		});

		Ok(cookies)
	}

	fn sign_out(&self, cookies: CookieJar, schemes: &[&str]) -> CookieJar
	{
		let mut state = self.lock();

		for &scheme in schemes {
			state.identities.remove(scheme);
		}

		state
			.ops
			.push(BridgeOp::SignOut(schemes.iter().map(|&s| s.to_owned()).collect()));

		cookies
	}

	fn identity(&self, _cookies: &CookieJar, scheme: &str) -> Option<ClaimsPrincipal>
	{
		self.lock().identities.get(scheme).cloned()
	}
}
