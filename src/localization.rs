//! User-visible message text originating from the flow controller itself.
//!
//! Messages produced by the [`UserService`] are treated as already-localized
//! strings and rendered verbatim; everything the controller says on its own
//! goes through [`MessageId`] so a host can swap the catalog out. Only the
//! default English table ships here.
//!
//! [`UserService`]: crate::services::users::UserService

use std::fmt;

/// Identifier of a controller-originated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageId
{
	/// Credentials were rejected, or no credentials were submitted at all.
	InvalidUsernameOrPassword,

	/// The username field was left blank.
	UsernameRequired,

	/// The password field was left blank.
	PasswordRequired,

	/// The sign-in flow referenced by the request has no stored message
	/// (expired, cleared, or never existed).
	NoSignInCookie,

	/// The external provider authenticated someone we cannot map to an
	/// account.
	NoMatchingExternalAccount,

	/// Local login is disabled and no external provider is eligible for
	/// this client.
	NoExternalProvider,

	/// Catch-all for internal failures; details are never shown to the
	/// browser.
	UnexpectedError,
}

impl MessageId
{
	/// The default English text.
	pub fn text(self) -> &'static str
	{
		match self {
			Self::InvalidUsernameOrPassword => "Invalid username or password",
			Self::UsernameRequired => "Username is required",
			Self::PasswordRequired => "Password is required",
			Self::NoSignInCookie => "There is no longer a sign-in request pending",
			Self::NoMatchingExternalAccount => {
				"The external account could not be matched to a user"
			},
			Self::NoExternalProvider => "No sign-in method is available",
			Self::UnexpectedError => "There was an unexpected error",
		}
	}
}

impl fmt::Display for MessageId
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.write_str(self.text())
	}
}

/// Formats the message shown when an external provider reports an error of
/// its own. The token is already length-bounded by the caller and is the
/// only request-derived data that is ever echoed into a page.
pub fn external_provider_error(token: &str) -> String
{
	format!("The external provider reported an error: {token}")
}
