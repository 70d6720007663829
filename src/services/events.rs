//! The event sink.
//!
//! Security-relevant moments in the flow are published as typed [`Event`]s.
//! Hosts route them wherever their audit story lives; the built-in
//! [`TracingEventService`] forwards them to [`tracing`].

use axum::async_trait;

/// A security-relevant event emitted by the flow controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event
{
	/// Pre-authentication short-circuited the flow into a sign-in.
	PreLoginSuccess
	{
		/// The sign-in flow.
		sign_in_id: String,

		/// The authenticated subject.
		subject: Option<String>,
	},

	/// Pre-authentication rejected the flow.
	PreLoginFailure
	{
		/// The sign-in flow.
		sign_in_id: String,

		/// The user-facing message.
		message: String,
	},

	/// A username/password attempt succeeded.
	LocalLoginSuccess
	{
		/// The submitted username.
		username: String,

		/// The sign-in flow.
		sign_in_id: String,

		/// The authenticated subject.
		subject: Option<String>,
	},

	/// A username/password attempt failed.
	LocalLoginFailure
	{
		/// The submitted username.
		username: String,

		/// The sign-in flow.
		sign_in_id: String,

		/// The user-facing message, when the user service produced one.
		message: Option<String>,
	},

	/// An external identity was mapped to a subject.
	ExternalLoginSuccess
	{
		/// The provider scheme.
		provider: String,

		/// The subject's id at the provider.
		provider_id: String,

		/// The sign-in flow.
		sign_in_id: String,
	},

	/// An external identity could not be mapped to a subject.
	ExternalLoginFailure
	{
		/// The provider scheme.
		provider: String,

		/// The subject's id at the provider.
		provider_id: String,

		/// The sign-in flow.
		sign_in_id: String,

		/// The user-facing message, when the user service produced one.
		message: Option<String>,
	},

	/// The external provider itself reported an error at the callback.
	ExternalLoginError
	{
		/// The provider's error token, length-bounded.
		error: String,
	},

	/// A suspended login finished and was promoted to a full sign-in.
	PartialLoginComplete
	{
		/// The continuation id.
		resume_id: String,

		/// The promoted subject.
		subject: Option<String>,
	},

	/// An authenticated user signed out.
	Logout
	{
		/// The subject that signed out.
		subject: Option<String>,

		/// The client that initiated the logout, if one did.
		client_id: Option<String>,
	},

	/// A request could not be served at all (bad flow state, misconfigured
	/// provider, downstream failure).
	EndpointFailure
	{
		/// The failing endpoint.
		endpoint: &'static str,

		/// What went wrong, for operators; never shown to the browser.
		reason: String,
	},
}

/// Receives [`Event`]s.
///
/// Raising an event must never fail the flow; sinks swallow their own
/// errors.
#[async_trait]
pub trait EventService: Send + Sync
{
	/// Publishes one event.
	async fn raise(&self, event: Event);
}

/// Forwards events to [`tracing`] under the `events` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventService;

#[async_trait]
impl EventService for TracingEventService
{
	async fn raise(&self, event: Event)
	{
		tracing::info!(target: "events", ?event);
	}
}
