//! The errors that can occur while driving an authentication flow.

use thiserror::Error;

use crate::localization::{self, MessageId};
use crate::services::{clients, users, views};
use crate::{bridge, messages};

/// Type alias with a default `Err` type of [`Error`].
///
/// [`Error`]: enum@Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The errors that can occur while driving an authentication flow.
///
/// None of these ever reach the browser as-is; the handlers translate them
/// into rendered pages (or the mandated bare status codes) via
/// [`AuthService::error_response`].
///
/// [`AuthService::error_response`]: super::AuthService::error_response
#[derive(Debug, Error)]
pub enum Error
{
	/// A user-controlled parameter exceeded the input length bound. The
	/// value is deliberately not carried here, so it cannot leak into
	/// pages or logs.
	#[error("input parameter exceeds the length bound")]
	InputTooLong,

	/// The request names a sign-in flow this browser has no message for.
	#[error("no sign-in request is pending for this flow")]
	NoSignInMessage,

	/// A required parameter was not supplied at all.
	#[error("missing required parameter {name:?}")]
	MissingParameter
	{
		/// The parameter's name.
		name: &'static str,
	},

	/// The anti-forgery cookie and form field are missing or disagree.
	#[error("anti-forgery token missing or mismatched")]
	AntiForgery,

	/// Username/password login is switched off, server-wide or for the
	/// requesting client.
	#[error("local login is disabled")]
	LocalLoginDisabled,

	/// The client's provider whitelist rejects the requested provider.
	#[error("provider {provider:?} is not allowed for client {client_id:?}")]
	ProviderNotAllowed
	{
		/// The requested provider.
		provider: String,

		/// The restricting client.
		client_id: String,
	},

	/// The requested provider is not configured on the host.
	#[error("provider {provider:?} is not configured")]
	UnknownProvider
	{
		/// The requested provider.
		provider: String,
	},

	/// Local login is disabled and no external provider is eligible for
	/// this client.
	#[error("no sign-in method is available for this client")]
	NoSignInMethods,

	/// The external callback was hit without a pending challenge.
	#[error("no challenge is pending")]
	NoChallengeContext,

	/// The host bridge holds no external identity to continue with.
	#[error("no external identity is available")]
	NoExternalIdentity,

	/// The external provider itself reported an error. The token is
	/// length-bounded before it lands here.
	#[error("external provider reported an error: {error}")]
	ExternalProviderError
	{
		/// The provider's (truncated) error token.
		error: String,
	},

	/// The resume route was hit without a suspended sign-in.
	#[error("no partial sign-in is available")]
	NoPartialSignIn,

	/// The suspended sign-in does not carry the continuation claim the
	/// resume request names. Nothing can be recovered.
	#[error("partial sign-in carries no matching resume claim")]
	MissingResumeClaim,

	/// A partial sign-in's redirect path could not be resolved into a
	/// URL.
	#[error("partial sign-in redirect path is not a valid URL")]
	InvalidPartialRedirect,

	/// The user service failed (as opposed to rejecting credentials).
	#[error(transparent)]
	Users(#[from] users::Error),

	/// The client store failed.
	#[error(transparent)]
	Clients(#[from] clients::Error),

	/// The view service failed.
	#[error(transparent)]
	Views(#[from] views::Error),

	/// A message store failed.
	#[error(transparent)]
	Messages(#[from] messages::Error),

	/// The host bridge failed.
	#[error(transparent)]
	Bridge(#[from] bridge::Error),
}

impl Error
{
	/// The text shown on the rendered error page. Controller-originated
	/// messages only; nothing request-derived except the bounded provider
	/// error token.
	pub(super) fn page_message(&self) -> String
	{
		match self {
			Self::NoSignInMessage => MessageId::NoSignInCookie.text().to_owned(),
			Self::NoSignInMethods => MessageId::NoExternalProvider.text().to_owned(),
			Self::ExternalProviderError { error } => localization::external_provider_error(error),
			_ => MessageId::UnexpectedError.text().to_owned(),
		}
	}

	/// Whether this error is an infrastructure failure worth an
	/// endpoint-failure event. Flow-state errors are expected traffic and
	/// raise their own events at the point of rejection.
	pub(super) fn is_infrastructure(&self) -> bool
	{
		matches!(
			self,
			Self::Users(_) | Self::Clients(_) | Self::Views(_) | Self::Messages(_) | Self::Bridge(_)
		)
	}
}
