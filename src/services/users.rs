//! The pluggable credential policy.
//!
//! A host supplies a [`UserService`] that validates credentials and maps
//! identities to subjects. The flow controller never sees a password
//! database; it only interprets [`AuthenticateResult`]s.

use axum::async_trait;

use crate::claims::{claim_types, ClaimsPrincipal};
use crate::messages::SignInMessage;

/// Type alias with a default `Err` type of [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An infrastructure failure inside a user service (its database is down,
/// a directory timed out, …).
///
/// Policy outcomes — rejected credentials, typed user-facing errors — are
/// *not* errors; they are [`AuthenticateResult`] values (or its absence).
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

/// The outcome of an authentication attempt.
///
/// "Credentials rejected" is modeled as the *absence* of a result
/// (`Option::None` at the call sites), not as a variant, so a result in
/// hand always describes a subject.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticateResult
{
	/// Authentication is complete. The principal carries the full sign-in
	/// claim set (see [`claim_types::FULL_SIGN_IN`]).
	Full
	{
		/// The authenticated subject.
		principal: ClaimsPrincipal,
	},

	/// Authentication is authentic but incomplete: the subject must finish
	/// an additional step (registration, terms, a second factor) at
	/// `redirect_path` and then return. The principal is not required to
	/// carry the full claim set.
	Partial
	{
		/// The partially authenticated subject.
		principal: ClaimsPrincipal,

		/// Where the additional step lives. A leading `~/` is resolved
		/// against the identity server's base path.
		redirect_path: String,
	},

	/// A typed, user-displayable failure. The message is treated as
	/// already localized.
	Error
	{
		/// The message to show on the login page.
		message: String,
	},
}

impl AuthenticateResult
{
	/// A full sign-in for the given principal.
	pub fn full(principal: ClaimsPrincipal) -> Self
	{
		Self::Full { principal }
	}

	/// A suspended sign-in that resumes after a visit to `redirect_path`.
	pub fn partial(principal: ClaimsPrincipal, redirect_path: impl Into<String>) -> Self
	{
		Self::Partial { principal, redirect_path: redirect_path.into() }
	}

	/// A typed failure with a user-displayable message.
	pub fn error(message: impl Into<String>) -> Self
	{
		Self::Error { message: message.into() }
	}

	/// The subject this result describes, if it describes one.
	pub fn principal(&self) -> Option<&ClaimsPrincipal>
	{
		match self {
			Self::Full { principal } | Self::Partial { principal, .. } => Some(principal),
			Self::Error { .. } => None,
		}
	}
}

/// An identity asserted by an external provider, reduced from the
/// principal the host bridge captured at callback time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity
{
	/// The provider's scheme name.
	pub provider: String,

	/// The subject's identifier *at the provider*.
	pub provider_id: String,

	/// Every claim the provider asserted.
	pub claims: Vec<crate::claims::Claim>,
}

impl ExternalIdentity
{
	/// Reduces a callback principal to an [`ExternalIdentity`] by locating
	/// its subject claim: the claim's issuer names the provider and its
	/// value the provider-local id. Returns `None` when the provider
	/// asserted no subject, in which case no account can ever be matched.
	pub fn from_principal(principal: &ClaimsPrincipal) -> Option<Self>
	{
		let subject = principal.find_first(claim_types::SUBJECT)?;

		Some(Self {
			provider: subject.issuer.clone(),
			provider_id: subject.value.clone(),
			claims: principal.claims().to_vec(),
		})
	}

	/// Rebuilds the identity parked on a partial sign-in principal: the
	/// bookkeeping claim recorded at suspension time supplies provider and
	/// id, the principal's claims come along wholesale.
	pub fn from_partial(principal: &ClaimsPrincipal) -> Option<Self>
	{
		let parked = principal.find_first(claim_types::EXTERNAL_PROVIDER_USER_ID)?;

		Some(Self {
			provider: parked.issuer.clone(),
			provider_id: parked.value.clone(),
			claims: principal.claims().to_vec(),
		})
	}
}

/// Validates credentials and maps identities to subjects.
///
/// Every method observes the originating [`SignInMessage`], so policy can
/// differ per client, tenant, or requested authentication context. All
/// methods may suspend on I/O; implementations own their concurrency.
#[async_trait]
pub trait UserService: Send + Sync
{
	/// Invoked when a sign-in flow starts, before any page is rendered.
	/// Lets policy short-circuit the flow entirely (SSO from another
	/// realm, client certificates, …). `None` means "proceed normally".
	async fn pre_authenticate(&self, message: &SignInMessage)
		-> Result<Option<AuthenticateResult>>;

	/// Validates a username/password pair. `None` means the credentials
	/// were rejected.
	async fn authenticate_local(
		&self,
		username: &str,
		password: &str,
		message: &SignInMessage,
	) -> Result<Option<AuthenticateResult>>;

	/// Maps an external identity to a subject. `None` means no account
	/// matches and none may be provisioned.
	async fn authenticate_external(
		&self,
		identity: &ExternalIdentity,
		message: &SignInMessage,
	) -> Result<Option<AuthenticateResult>>;

	/// Invoked when an authenticated subject signs out.
	async fn sign_out(&self, principal: &ClaimsPrincipal) -> Result<()>;
}
