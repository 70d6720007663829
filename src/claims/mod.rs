//! Claims and principals exchanged with the host authentication framework.
//!
//! Principals are produced by the [`UserService`] or by an external identity
//! provider, mutated by the flow controller (bookkeeping claims are added
//! for partial logins and stripped again before the final sign-in), and
//! handed to the [`HostAuthBridge`] for issuance. They are plain data; the
//! bridge is responsible for protecting them at rest.
//!
//! [`UserService`]: crate::services::users::UserService
//! [`HostAuthBridge`]: crate::bridge::HostAuthBridge

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub mod claim_types;

/// The issuer recorded on claims that were produced locally rather than by
/// an external identity provider.
pub const LOCAL_ISSUER: &str = "local";

/// The `idp` claim value for identities authenticated by this server itself
/// (i.e. via username/password) rather than by an external provider.
pub const BUILT_IN_IDENTITY_PROVIDER: &str = "idsrv";

/// A single statement about a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim
{
	/// What kind of statement this is. See [`claim_types`].
	#[serde(rename = "type")]
	pub claim_type: String,

	/// The statement's value.
	pub value: String,

	/// Who made the statement.
	///
	/// For claims copied from an external identity provider this is the
	/// provider's scheme name; everything minted locally uses
	/// [`LOCAL_ISSUER`].
	#[serde(default = "default_issuer")]
	pub issuer: String,
}

#[allow(clippy::missing_docs_in_private_items)]
fn default_issuer() -> String
{
	String::from(LOCAL_ISSUER)
}

impl Claim
{
	/// Creates a new locally-issued [`Claim`].
	pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self
	{
		Self {
			claim_type: claim_type.into(),
			value: value.into(),
			issuer: default_issuer(),
		}
	}

	/// Creates a new [`Claim`] with an explicit issuer.
	pub fn with_issuer(
		claim_type: impl Into<String>,
		value: impl Into<String>,
		issuer: impl Into<String>,
	) -> Self
	{
		Self {
			claim_type: claim_type.into(),
			value: value.into(),
			issuer: issuer.into(),
		}
	}
}

/// An authenticated (or partially authenticated) subject: an ordered bag of
/// [`Claim`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsPrincipal
{
	/// The subject's claims.
	claims: Vec<Claim>,
}

impl ClaimsPrincipal
{
	/// Creates a principal from raw claims.
	pub fn new(claims: Vec<Claim>) -> Self
	{
		Self { claims }
	}

	/// Creates a fully authenticated principal carrying the complete
	/// sign-in claim set: subject, display name, authentication method,
	/// authentication time (now), and identity provider.
	pub fn authenticated(
		subject: impl Into<String>,
		name: impl Into<String>,
		method: impl Into<String>,
		identity_provider: impl Into<String>,
	) -> Self
	{
		let auth_time = OffsetDateTime::now_utc().unix_timestamp();

		Self {
			claims: vec![
				Claim::new(claim_types::SUBJECT, subject),
				Claim::new(claim_types::NAME, name),
				Claim::new(claim_types::AUTHENTICATION_METHOD, method),
				Claim::new(claim_types::AUTHENTICATION_TIME, auth_time.to_string()),
				Claim::new(claim_types::IDENTITY_PROVIDER, identity_provider),
			],
		}
	}

	/// Returns all claims.
	pub fn claims(&self) -> &[Claim]
	{
		&self.claims
	}

	/// Returns the first claim of the given type, if any.
	pub fn find_first(&self, claim_type: &str) -> Option<&Claim>
	{
		self.claims
			.iter()
			.find(|claim| claim.claim_type == claim_type)
	}

	/// Whether any claim of the given type is present.
	pub fn has_claim_type(&self, claim_type: &str) -> bool
	{
		self.find_first(claim_type).is_some()
	}

	/// The subject identifier, if present.
	pub fn subject(&self) -> Option<&str>
	{
		self.find_first(claim_types::SUBJECT)
			.map(|claim| claim.value.as_str())
	}

	/// The display name, if present.
	pub fn name(&self) -> Option<&str>
	{
		self.find_first(claim_types::NAME)
			.map(|claim| claim.value.as_str())
	}

	/// The identity provider that authenticated this subject, if recorded.
	pub fn identity_provider(&self) -> Option<&str>
	{
		self.find_first(claim_types::IDENTITY_PROVIDER)
			.map(|claim| claim.value.as_str())
	}

	/// Adds a claim.
	pub fn add_claim(&mut self, claim: Claim)
	{
		self.claims.push(claim);
	}

	/// Removes every claim of the given type.
	pub fn remove_claims(&mut self, claim_type: &str)
	{
		self.claims.retain(|claim| claim.claim_type != claim_type);
	}

	/// Whether this principal carries every claim required of a full
	/// sign-in (see [`claim_types::FULL_SIGN_IN`]).
	///
	/// Partial sign-ins are not required to satisfy this; a partial
	/// principal that does satisfy it can be promoted directly at resume
	/// time without another round through the user service.
	pub fn is_complete(&self) -> bool
	{
		claim_types::FULL_SIGN_IN
			.iter()
			.all(|&claim_type| self.has_claim_type(claim_type))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn authenticated_principals_are_complete()
	{
		let principal =
			ClaimsPrincipal::authenticated("alice-id", "alice", "password", BUILT_IN_IDENTITY_PROVIDER);

		assert!(principal.is_complete());
		assert_eq!(principal.subject(), Some("alice-id"));
		assert_eq!(principal.name(), Some("alice"));
		assert_eq!(principal.identity_provider(), Some(BUILT_IN_IDENTITY_PROVIDER));
	}

	#[test]
	fn missing_method_claim_is_incomplete()
	{
		let mut principal =
			ClaimsPrincipal::authenticated("alice-id", "alice", "password", BUILT_IN_IDENTITY_PROVIDER);

		principal.remove_claims(claim_types::AUTHENTICATION_METHOD);

		assert!(!principal.is_complete());
	}

	#[test]
	fn remove_claims_removes_every_instance()
	{
		let mut principal = ClaimsPrincipal::new(vec![
			Claim::new("role", "admin"),
			Claim::new("role", "user"),
			Claim::new(claim_types::SUBJECT, "alice-id"),
		]);

		principal.remove_claims("role");

		assert!(!principal.has_claim_type("role"));
		assert_eq!(principal.subject(), Some("alice-id"));
	}

	#[test]
	fn claims_round_trip_through_json()
	{
		let principal = ClaimsPrincipal::new(vec![Claim::with_issuer(
			claim_types::EXTERNAL_PROVIDER_USER_ID,
			"goog-123",
			"goog",
		)]);

		let json = serde_json::to_string(&principal).unwrap();
		let parsed = serde_json::from_str::<ClaimsPrincipal>(&json).unwrap();

		assert_eq!(parsed, principal);
	}
}
