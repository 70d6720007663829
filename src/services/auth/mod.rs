//! The [`AuthService`] drives browsers through the interactive
//! authentication state machine: local credential login, federated login
//! against external providers, suspension and resumption of partial
//! sign-ins, and sign-out.
//!
//! The service is request-scoped in effect: nothing mutable lives in it,
//! and everything a flow needs between two requests travels in signed
//! cookies addressed by flow id. Each transition clears the cookies whose
//! purpose is served and issues the next ones, so a browser can run any
//! number of flows concurrently without server-side bookkeeping.
//!
//! The HTTP surface lives in the `http` module; every handler funnels into
//! an operation here.

use std::sync::Arc;

use ::http::StatusCode;
use axum_extra::extract::CookieJar;
use tap::Tap;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::bridge::{schemes, ChallengeProperties, HostAuthBridge, SignInProperties};
use crate::claims::{claim_types, Claim, ClaimsPrincipal, BUILT_IN_IDENTITY_PROVIDER};
use crate::config::{AuthOptions, CookieConfig};
use crate::cookies;
use crate::localization::MessageId;
use crate::messages::{MessageStore, SignInMessage, SignOutMessage};
use crate::services::clients::ClientStore;
use crate::services::events::{Event, EventService};
use crate::services::users::{AuthenticateResult, ExternalIdentity, UserService};
use crate::services::views::{
	ErrorViewModel,
	LoggedOutViewModel,
	LoginPageLink,
	LoginViewModel,
	LogoutViewModel,
	SignOutUrlSource,
	ViewService,
};

pub(crate) mod http;

pub mod anti_forgery;
pub use anti_forgery::AntiForgery;

mod error;
pub use error::{Error, Result};

pub(crate) mod models;
pub use models::FlowResponse;
use models::{LoginForm, LogoutForm};

/// The hard upper bound on every user-controlled string parameter.
///
/// Anything longer is hostile or broken; such requests get the generic
/// error page and are otherwise not acted upon at all.
pub const MAX_INPUT_PARAM_LENGTH: usize = 100;

/// The endpoint name recorded on failure events.
const ENDPOINT: &str = "authenticate";

/// The pluggable collaborators an [`AuthService`] drives.
#[allow(clippy::missing_docs_in_private_items)]
pub struct AuthServices
{
	pub users: Arc<dyn UserService>,
	pub clients: Arc<dyn ClientStore>,
	pub views: Arc<dyn ViewService>,
	pub events: Arc<dyn EventService>,
	pub bridge: Arc<dyn HostAuthBridge>,
	pub sign_in_messages: Arc<dyn MessageStore<SignInMessage>>,
	pub sign_out_messages: Arc<dyn MessageStore<SignOutMessage>>,
	pub sign_out_urls: Arc<dyn SignOutUrlSource>,
}

/// The interactive authentication flow controller.
#[derive(Clone)]
#[allow(clippy::missing_docs_in_private_items)]
pub struct AuthService
{
	options: Arc<AuthOptions>,
	cookie_config: Arc<CookieConfig>,
	anti_forgery: AntiForgery,
	users: Arc<dyn UserService>,
	clients: Arc<dyn ClientStore>,
	views: Arc<dyn ViewService>,
	events: Arc<dyn EventService>,
	bridge: Arc<dyn HostAuthBridge>,
	sign_in_messages: Arc<dyn MessageStore<SignInMessage>>,
	sign_out_messages: Arc<dyn MessageStore<SignOutMessage>>,
	sign_out_urls: Arc<dyn SignOutUrlSource>,
}

impl std::fmt::Debug for AuthService
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		f.debug_struct("AuthService")
			.field("options", &self.options)
			.finish_non_exhaustive()
	}
}

/// A sign-in the flow controller has decided to perform.
///
/// Errors and rejections never reach this type; by the time an outcome
/// exists there is a principal to issue.
#[derive(Debug)]
enum SignInOutcome
{
	/// Issue the primary identity and return to the relying party.
	Full(ClaimsPrincipal),

	/// Suspend: issue the partial identity and detour to `redirect_path`.
	Partial
	{
		/// The partially authenticated subject.
		principal: ClaimsPrincipal,

		/// Where the missing step lives.
		redirect_path: String,
	},
}

impl AuthService
{
	/// Creates a new [`AuthService`].
	pub fn new(options: AuthOptions, cookie_config: CookieConfig, services: AuthServices)
		-> Self
	{
		let cookie_config = Arc::new(cookie_config);

		Self {
			options: Arc::new(options),
			anti_forgery: AntiForgery::new(Arc::clone(&cookie_config)),
			cookie_config,
			users: services.users,
			clients: services.clients,
			views: services.views,
			events: services.events,
			bridge: services.bridge,
			sign_in_messages: services.sign_in_messages,
			sign_out_messages: services.sign_out_messages,
			sign_out_urls: services.sign_out_urls,
		}
	}

	/// `GET /login` — enter a sign-in flow.
	#[tracing::instrument(level = "debug", skip_all, fields(flow.id = signin))]
	pub(crate) async fn show_login(
		&self,
		cookies: CookieJar,
		request_id: Option<String>,
		signin: Option<&str>,
	) -> Result<FlowResponse>
	{
		let signin = bounded(signin.ok_or(Error::NoSignInMessage)?)?;
		let message = self
			.sign_in_messages
			.read(&cookies, signin)?
			.ok_or(Error::NoSignInMessage)?;

		match self.users.pre_authenticate(&message).await? {
			Some(AuthenticateResult::Error { message: error }) => {
				self.events
					.raise(Event::PreLoginFailure {
						sign_in_id: signin.to_owned(),
						message: error.clone(),
					})
					.await;

				return self.rendered_error(request_id, error).await;
			},
			Some(result) => {
				self.events
					.raise(Event::PreLoginSuccess {
						sign_in_id: signin.to_owned(),
						subject: result
							.principal()
							.and_then(ClaimsPrincipal::subject)
							.map(ToOwned::to_owned),
					})
					.await;

				let outcome = match result {
					AuthenticateResult::Full { principal } => SignInOutcome::Full(principal),
					AuthenticateResult::Partial { principal, redirect_path } => {
						SignInOutcome::Partial { principal, redirect_path }
					},
					AuthenticateResult::Error { .. } => {
						unreachable!("error results are handled above")
					},
				};

				return self
					.sign_in_and_redirect(cookies, signin, &message, outcome, None)
					.await;
			},
			None => {},
		}

		// An `idp` hint skips the login page, but only when the provider
		// is both allowed for the client and configured on the host.
		if let Some(provider) = message.identity_provider.as_deref() {
			let allowed = match message.client_id.as_deref() {
				Some(client_id) => {
					self.clients
						.is_valid_identity_provider(client_id, provider)
						.await?
				},
				None => true,
			};

			if allowed && self.bridge.has_provider(provider) {
				return self.start_challenge(cookies, signin, provider);
			}
		}

		self.render_login_page(cookies, request_id, signin, &message, None, None, None)
			.await
	}

	/// `POST /login` — validate local credentials.
	#[tracing::instrument(level = "debug", skip_all, fields(flow.id = signin))]
	pub(crate) async fn submit_login(
		&self,
		cookies: CookieJar,
		request_id: Option<String>,
		signin: Option<&str>,
		form: LoginForm,
	) -> Result<FlowResponse>
	{
		self.anti_forgery.verify(&cookies, form.xsrf.as_deref())?;

		if !self.options.enable_local_login {
			return Err(Error::LocalLoginDisabled);
		}

		let signin = bounded(signin.ok_or(Error::NoSignInMessage)?)?;
		let message = self
			.sign_in_messages
			.read(&cookies, signin)?
			.ok_or(Error::NoSignInMessage)?;

		if !self.local_login_allowed(&message).await? {
			return Err(Error::LocalLoginDisabled);
		}

		let remember_me = self
			.options
			.allow_remember_me
			.then(|| form.remember_me.unwrap_or(false));

		if form.username.is_none() && form.password.is_none() {
			return self
				.render_login_page(
					cookies,
					request_id,
					signin,
					&message,
					Some(MessageId::InvalidUsernameOrPassword.text().to_owned()),
					None,
					remember_me,
				)
				.await;
		}

		let username = form.username.as_deref().unwrap_or_default().trim().to_owned();
		let password = form.password.unwrap_or_default();

		if username.is_empty() {
			return self
				.render_login_page(
					cookies,
					request_id,
					signin,
					&message,
					Some(MessageId::UsernameRequired.text().to_owned()),
					None,
					remember_me,
				)
				.await;
		}

		if password.trim().is_empty() {
			return self
				.render_login_page(
					cookies,
					request_id,
					signin,
					&message,
					Some(MessageId::PasswordRequired.text().to_owned()),
					Some(username),
					remember_me,
				)
				.await;
		}

		// Oversize credentials are probing, not typos: re-render without
		// any error text and without echoing the values.
		if username.chars().count() > MAX_INPUT_PARAM_LENGTH
			|| password.chars().count() > MAX_INPUT_PARAM_LENGTH
		{
			return self
				.render_login_page(cookies, request_id, signin, &message, None, None, remember_me)
				.await;
		}

		match self
			.users
			.authenticate_local(&username, &password, &message)
			.await?
		{
			None => {
				self.events
					.raise(Event::LocalLoginFailure {
						username: username.clone(),
						sign_in_id: signin.to_owned(),
						message: None,
					})
					.await;

				self.render_login_page(
					cookies,
					request_id,
					signin,
					&message,
					Some(MessageId::InvalidUsernameOrPassword.text().to_owned()),
					Some(username),
					remember_me,
				)
				.await
			},
			Some(AuthenticateResult::Error { message: error }) => {
				self.events
					.raise(Event::LocalLoginFailure {
						username: username.clone(),
						sign_in_id: signin.to_owned(),
						message: Some(error.clone()),
					})
					.await;

				self.render_login_page(
					cookies,
					request_id,
					signin,
					&message,
					Some(error),
					Some(username),
					remember_me,
				)
				.await
			},
			Some(result) => {
				let cookies =
					cookies::remember_username(&self.cookie_config, cookies, &username);

				self.events
					.raise(Event::LocalLoginSuccess {
						username: username.clone(),
						sign_in_id: signin.to_owned(),
						subject: result
							.principal()
							.and_then(ClaimsPrincipal::subject)
							.map(ToOwned::to_owned),
					})
					.await;

				let outcome = match result {
					AuthenticateResult::Full { principal } => SignInOutcome::Full(principal),
					AuthenticateResult::Partial { principal, redirect_path } => {
						SignInOutcome::Partial { principal, redirect_path }
					},
					AuthenticateResult::Error { .. } => {
						unreachable!("error results are handled above")
					},
				};

				self.sign_in_and_redirect(cookies, signin, &message, outcome, remember_me)
					.await
			},
		}
	}

	/// `GET /external` — challenge an external provider.
	#[tracing::instrument(level = "debug", skip_all, fields(flow.id = signin, provider))]
	pub(crate) async fn external_challenge(
		&self,
		cookies: CookieJar,
		signin: Option<&str>,
		provider: Option<&str>,
	) -> Result<FlowResponse>
	{
		let signin = bounded(signin.ok_or(Error::NoSignInMessage)?)?;
		let provider = bounded(provider.ok_or(Error::MissingParameter { name: "provider" })?)?;

		let message = self
			.sign_in_messages
			.read(&cookies, signin)?
			.ok_or(Error::NoSignInMessage)?;

		if let Some(client_id) = message.client_id.as_deref() {
			if !self
				.clients
				.is_valid_identity_provider(client_id, provider)
				.await?
			{
				self.events
					.raise(Event::EndpointFailure {
						endpoint: ENDPOINT,
						reason: format!(
							"provider {provider:?} not allowed for client {client_id:?}"
						),
					})
					.await;

				return Err(Error::ProviderNotAllowed {
					provider: provider.to_owned(),
					client_id: client_id.to_owned(),
				});
			}
		}

		if !self.bridge.has_provider(provider) {
			self.events
				.raise(Event::EndpointFailure {
					endpoint: ENDPOINT,
					reason: format!("provider {provider:?} is not configured"),
				})
				.await;

			return Err(Error::UnknownProvider { provider: provider.to_owned() });
		}

		self.start_challenge(cookies, signin, provider)
	}

	/// `GET /callback` — an external provider sent the browser back.
	#[tracing::instrument(level = "debug", skip_all)]
	pub(crate) async fn external_callback(
		&self,
		cookies: CookieJar,
		request_id: Option<String>,
		error: Option<String>,
	) -> Result<FlowResponse>
	{
		if let Some(error) = error {
			let error = error
				.chars()
				.take(MAX_INPUT_PARAM_LENGTH)
				.collect::<String>();

			self.events
				.raise(Event::ExternalLoginError { error: error.clone() })
				.await;

			return Err(Error::ExternalProviderError { error });
		}

		let (cookies, properties) = self.bridge.take_challenge_properties(cookies);
		let properties = properties.ok_or(Error::NoChallengeContext)?;
		let signin = properties.sign_in_id.as_str();

		let message = self
			.sign_in_messages
			.read(&cookies, signin)?
			.ok_or(Error::NoSignInMessage)?;

		let principal = self
			.bridge
			.identity(&cookies, schemes::EXTERNAL)
			.ok_or(Error::NoExternalIdentity)?;

		let Some(identity) = ExternalIdentity::from_principal(&principal) else {
			tracing::debug!("external principal carries no subject claim");

			return self
				.render_login_page(
					cookies,
					request_id,
					signin,
					&message,
					Some(MessageId::NoMatchingExternalAccount.text().to_owned()),
					None,
					None,
				)
				.await;
		};

		self.finish_external_login(cookies, request_id, signin, &message, identity)
			.await
	}

	/// `GET /resume` — re-enter a suspended sign-in.
	#[tracing::instrument(level = "debug", skip_all, fields(resume.id = resume))]
	pub(crate) async fn resume_login(
		&self,
		cookies: CookieJar,
		request_id: Option<String>,
		resume: Option<&str>,
	) -> Result<FlowResponse>
	{
		let resume = bounded(resume.ok_or(Error::MissingParameter { name: "resume" })?)?;

		let mut principal = self
			.bridge
			.identity(&cookies, schemes::PARTIAL)
			.ok_or(Error::NoPartialSignIn)?;

		let resume_claim = claim_types::partial_login_resume_id(resume);
		let signin = principal
			.find_first(&resume_claim)
			.map(|claim| claim.value.clone())
			.ok_or(Error::MissingResumeClaim)?;

		let message = self
			.sign_in_messages
			.read(&cookies, &signin)?
			.ok_or(Error::NoSignInMessage)?;

		// A partial principal that meanwhile satisfies the full sign-in
		// claim set is promoted directly; the bookkeeping claims must not
		// survive into the issued identity.
		if principal.is_complete() {
			for claim_type in claim_types::bookkeeping() {
				principal.remove_claims(claim_type);
			}
			principal.remove_claims(&resume_claim);

			self.events
				.raise(Event::PartialLoginComplete {
					resume_id: resume.to_owned(),
					subject: principal.subject().map(ToOwned::to_owned),
				})
				.await;

			return self
				.sign_in_and_redirect(
					cookies,
					&signin,
					&message,
					SignInOutcome::Full(principal),
					None,
				)
				.await;
		}

		let identity =
			ExternalIdentity::from_partial(&principal).ok_or(Error::NoExternalIdentity)?;

		self.finish_external_login(cookies, request_id, &signin, &message, identity)
			.await
	}

	/// `GET /logout` — the sign-out prompt.
	#[tracing::instrument(level = "debug", skip_all, fields(flow.id = id))]
	pub(crate) async fn show_logout(
		&self,
		cookies: CookieJar,
		request_id: Option<String>,
		id: Option<&str>,
	) -> Result<FlowResponse>
	{
		let id = id.map(bounded).transpose()?;

		let principal = self.bridge.identity(&cookies, schemes::PRIMARY);

		// Nothing to confirm for anonymous browsers; a client-initiated
		// logout is silent by contract; and hosts can switch the prompt
		// off entirely.
		let skip_prompt = match (&principal, id) {
			(None, _) => true,
			(Some(_), Some(id)) => {
				self.sign_out_messages
					.read(&cookies, id)?
					.is_some_and(|message| message.client_id.is_some())
					|| !self.options.enable_sign_out_prompt
			},
			(Some(_), None) => !self.options.enable_sign_out_prompt,
		};

		if skip_prompt {
			return self.sign_out_and_render(cookies, request_id, id).await;
		}

		let current_user = principal
			.as_ref()
			.and_then(ClaimsPrincipal::name)
			.map(ToOwned::to_owned);

		let (cookies, anti_forgery) = self.anti_forgery.ensure(cookies);

		let logout_url = self
			.route_url("logout")
			.tap_mut(|url| {
				if let Some(id) = id {
					url.query_pairs_mut().append_pair("id", id);
				}
			})
			.to_string();

		let model = LogoutViewModel {
			request_id,
			site_name: self.options.site_name.clone(),
			site_url: self.options.site_url.clone(),
			logout_url,
			anti_forgery,
			client_name: None,
			current_user,
		};

		let html = self.views.logout(&model).await?;

		Ok(FlowResponse::Page { cookies, html })
	}

	/// `POST /logout` — actually sign out.
	#[tracing::instrument(level = "debug", skip_all, fields(flow.id = id))]
	pub(crate) async fn submit_logout(
		&self,
		cookies: CookieJar,
		request_id: Option<String>,
		id: Option<&str>,
		form: LogoutForm,
	) -> Result<FlowResponse>
	{
		self.anti_forgery.verify(&cookies, form.xsrf.as_deref())?;

		let id = id.map(bounded).transpose()?;

		self.sign_out_and_render(cookies, request_id, id).await
	}

	/// The shared sign-out tail: clear everything, notify, render the
	/// logged-out page. Also reached from `GET /logout` when the prompt is
	/// skipped, and safe for anonymous browsers (cleanup only).
	async fn sign_out_and_render(
		&self,
		cookies: CookieJar,
		request_id: Option<String>,
		id: Option<&str>,
	) -> Result<FlowResponse>
	{
		let session_id = cookies::session_id(&cookies);
		let cookies = cookies::clear_session_id(&self.cookie_config, cookies);

		let message = match id {
			Some(id) => self.sign_out_messages.read(&cookies, id)?,
			None => None,
		};
		let cookies = match id {
			Some(id) => self.sign_out_messages.clear(cookies, id),
			None => cookies,
		};

		let principal = self.bridge.identity(&cookies, schemes::PRIMARY);
		let mut cookies = self.bridge.sign_out(cookies, &schemes::ALL);

		if let Some(principal) = &principal {
			// Federated sign-outs propagate to the provider's own scheme.
			if let Some(idp) = principal.identity_provider() {
				if idp != BUILT_IN_IDENTITY_PROVIDER {
					cookies = self.bridge.sign_out(cookies, &[idp]);
				}
			}

			self.users.sign_out(principal).await?;

			self.events
				.raise(Event::Logout {
					subject: principal.subject().map(ToOwned::to_owned),
					client_id: message.as_ref().and_then(|message| message.client_id.clone()),
				})
				.await;
		}

		let client_name = match message.as_ref().and_then(|message| message.client_id.as_deref())
		{
			Some(client_id) => {
				self.clients
					.find_client(client_id)
					.await?
					.map(|client| client.client_name)
			},
			None => None,
		};

		let session_id = session_id.map(|session_id| session_id.to_string());
		let model = LoggedOutViewModel {
			request_id,
			site_name: self.options.site_name.clone(),
			site_url: self.options.site_url.clone(),
			iframe_urls: self.sign_out_urls.iframe_urls(session_id.as_deref()),
			client_name,
			redirect_url: message.and_then(|message| message.return_url),
		};

		let html = self.views.logged_out(&model).await?;

		Ok(FlowResponse::Page { cookies, html })
	}

	/// Translates a flow error into what the browser actually sees.
	pub(crate) async fn error_response(&self, request_id: Option<String>, error: Error)
		-> FlowResponse
	{
		match &error {
			// The anti-forgery gate and the local-login switch have
			// mandated bare statuses; everything else renders.
			Error::AntiForgery => return FlowResponse::Status(StatusCode::FORBIDDEN),
			Error::LocalLoginDisabled => {
				return FlowResponse::Status(StatusCode::METHOD_NOT_ALLOWED)
			},
			_ => {},
		}

		if error.is_infrastructure() {
			tracing::error!(
				error = &error as &dyn std::error::Error,
				"authentication endpoint failure",
			);

			self.events
				.raise(Event::EndpointFailure { endpoint: ENDPOINT, reason: error.to_string() })
				.await;
		} else {
			tracing::debug!(%error, "rendering error page");
		}

		self.rendered_error(request_id, error.page_message())
			.await
			.unwrap_or_else(|error| {
				tracing::error!(
					error = &error as &dyn std::error::Error,
					"failed to render error page",
				);

				FlowResponse::Status(StatusCode::INTERNAL_SERVER_ERROR)
			})
	}

	/// Renders the error page with an already-trusted message.
	async fn rendered_error(&self, request_id: Option<String>, message: String)
		-> Result<FlowResponse>
	{
		let model = ErrorViewModel {
			request_id,
			site_name: self.options.site_name.clone(),
			site_url: self.options.site_url.clone(),
			error_message: message,
		};

		let html = self.views.error(&model).await?;

		Ok(FlowResponse::ErrorPage { html })
	}

	/// Stashes challenge state and answers 401 for the host middleware to
	/// rewrite into the provider redirect.
	fn start_challenge(&self, cookies: CookieJar, signin: &str, provider: &str)
		-> Result<FlowResponse>
	{
		let properties = ChallengeProperties {
			sign_in_id: signin.to_owned(),
			provider: provider.to_owned(),
			redirect_uri: self.route_url("callback"),
		};

		tracing::debug!(provider, "challenging external provider");

		let cookies = self.bridge.challenge(cookies, &properties)?;

		Ok(FlowResponse::Challenge { cookies })
	}

	/// The shared external-login tail used by the callback and by resume:
	/// map the external identity to a subject and act on the outcome.
	async fn finish_external_login(
		&self,
		cookies: CookieJar,
		request_id: Option<String>,
		signin: &str,
		message: &SignInMessage,
		identity: ExternalIdentity,
	) -> Result<FlowResponse>
	{
		match self.users.authenticate_external(&identity, message).await? {
			None => {
				self.events
					.raise(Event::ExternalLoginFailure {
						provider: identity.provider.clone(),
						provider_id: identity.provider_id.clone(),
						sign_in_id: signin.to_owned(),
						message: None,
					})
					.await;

				self.render_login_page(
					cookies,
					request_id,
					signin,
					message,
					Some(MessageId::NoMatchingExternalAccount.text().to_owned()),
					None,
					None,
				)
				.await
			},
			Some(AuthenticateResult::Error { message: error }) => {
				self.events
					.raise(Event::ExternalLoginFailure {
						provider: identity.provider.clone(),
						provider_id: identity.provider_id.clone(),
						sign_in_id: signin.to_owned(),
						message: Some(error.clone()),
					})
					.await;

				self.render_login_page(
					cookies,
					request_id,
					signin,
					message,
					Some(error),
					None,
					None,
				)
				.await
			},
			Some(result) => {
				self.events
					.raise(Event::ExternalLoginSuccess {
						provider: identity.provider.clone(),
						provider_id: identity.provider_id.clone(),
						sign_in_id: signin.to_owned(),
					})
					.await;

				let outcome = match result {
					AuthenticateResult::Full { principal } => SignInOutcome::Full(principal),
					AuthenticateResult::Partial { principal, redirect_path } => {
						SignInOutcome::Partial { principal, redirect_path }
					},
					AuthenticateResult::Error { .. } => {
						unreachable!("error results are handled above")
					},
				};

				self.sign_in_and_redirect(cookies, signin, message, outcome, None)
					.await
			},
		}
	}

	/// Issues the decided sign-in and computes where to send the browser.
	///
	/// All three authentication schemes are cleared before anything is
	/// issued, so a stale identity can never coexist with the new one. A
	/// full sign-in consumes the flow's message; a partial one keeps it,
	/// because the flow re-enters at resume time.
	async fn sign_in_and_redirect(
		&self,
		cookies: CookieJar,
		signin: &str,
		message: &SignInMessage,
		outcome: SignInOutcome,
		remember_me: Option<bool>,
	) -> Result<FlowResponse>
	{
		let (cookies, location) = match outcome {
			SignInOutcome::Partial { mut principal, redirect_path } => {
				let resume_id = Uuid::new_v4().as_simple().to_string();
				let resume_url = self.route_url("resume").tap_mut(|url| {
					url.query_pairs_mut().append_pair("resume", &resume_id);
				});

				principal.add_claim(Claim::new(
					claim_types::PARTIAL_LOGIN_RETURN_URL,
					resume_url.as_str(),
				));
				principal.add_claim(Claim::new(
					claim_types::partial_login_resume_id(&resume_id),
					signin,
				));

				tracing::debug!(%resume_url, "suspending sign-in");

				let cookies = self.bridge.sign_out(cookies, &schemes::ALL);
				let cookies = self.bridge.sign_in(
					cookies,
					schemes::PARTIAL,
					&principal,
					&SignInProperties::session(),
				)?;

				(cookies, self.resolve_redirect_path(&redirect_path)?)
			},
			SignInOutcome::Full(principal) => {
				let cookies = self.sign_in_messages.clear(cookies, signin);
				let cookies = self.bridge.sign_out(cookies, &schemes::ALL);
				let cookies = self.bridge.sign_in(
					cookies,
					schemes::PRIMARY,
					&principal,
					&self.persistence(remember_me),
				)?;

				(cookies, message.return_url.clone())
			},
		};

		let (cookies, session_id) = cookies::issue_session_id(&self.cookie_config, cookies);

		tracing::debug!(%session_id, %location, "sign-in issued");

		Ok(FlowResponse::Redirect { cookies, location })
	}

	/// How to persist the primary cookie, given the user's remember-me
	/// answer (`None` when they were never asked).
	fn persistence(&self, remember_me: Option<bool>) -> SignInProperties
	{
		let persistent = remember_me == Some(true)
			|| (remember_me != Some(false) && self.options.persistent_cookies);
		let expires = (remember_me == Some(true))
			.then(|| OffsetDateTime::now_utc() + self.options.remember_me_duration);

		SignInProperties { persistent, expires }
	}

	/// Whether this flow may use username/password at all.
	async fn local_login_allowed(&self, message: &SignInMessage) -> Result<bool>
	{
		if !self.options.enable_local_login {
			return Ok(false);
		}

		Ok(match message.client_id.as_deref() {
			Some(client_id) => {
				self.clients
					.find_client(client_id)
					.await?
					.is_none_or(|client| client.enable_local_login)
			},
			None => true,
		})
	}

	/// Assembles and renders the login page.
	///
	/// When local login is out and exactly one visible provider remains,
	/// the page is skipped in favor of a redirect straight to that
	/// provider; zero eligible providers is a dead end. Both shortcuts
	/// only apply on clean renders, never when an error is being shown.
	#[allow(clippy::too_many_arguments)]
	async fn render_login_page(
		&self,
		cookies: CookieJar,
		request_id: Option<String>,
		signin: &str,
		message: &SignInMessage,
		error_message: Option<String>,
		username: Option<String>,
		remember_me: Option<bool>,
	) -> Result<FlowResponse>
	{
		let client = match message.client_id.as_deref() {
			Some(client_id) => self.clients.find_client(client_id).await?,
			None => None,
		};

		let local_allowed = self.options.enable_local_login
			&& client.as_ref().is_none_or(|client| client.enable_local_login);

		let eligible = self
			.bridge
			.external_providers()
			.into_iter()
			.filter(|provider| {
				client
					.as_ref()
					.is_none_or(|client| client.allows_identity_provider(&provider.name))
			})
			.filter(|provider| provider.visible)
			.collect::<Vec<_>>();

		if !local_allowed && error_message.is_none() {
			match eligible.as_slice() {
				[] => return Err(Error::NoSignInMethods),
				[only] => {
					let location = self.route_url("external").tap_mut(|url| {
						url.query_pairs_mut()
							.append_pair("signin", signin)
							.append_pair("provider", &only.name);
					});

					tracing::debug!(provider = %only.name, "single provider, skipping login page");

					return Ok(FlowResponse::Redirect { cookies, location });
				},
				_ => {},
			}
		}

		let external_providers = eligible
			.iter()
			.map(|provider| LoginPageLink {
				text: provider.display_name.clone(),
				href: self
					.route_url("external")
					.tap_mut(|url| {
						url.query_pairs_mut()
							.append_pair("signin", signin)
							.append_pair("provider", &provider.name);
					})
					.to_string(),
			})
			.collect();

		let additional_links = self
			.options
			.login_page_links
			.iter()
			.map(|link| {
				let href = link.href.replace("{signin}", signin);

				LoginPageLink {
					text: link.text.clone(),
					href: match href.strip_prefix("~/") {
						Some(rest) => self.route_url(rest).to_string(),
						None => href,
					},
				}
			})
			.collect();

		let current_user = self
			.bridge
			.identity(&cookies, schemes::PRIMARY)
			.as_ref()
			.and_then(ClaimsPrincipal::name)
			.map(ToOwned::to_owned);

		// Submitted value wins, then the protocol's login hint, then the
		// username remembered from the last local login.
		let username = username
			.or_else(|| {
				self.options
					.enable_login_hint
					.then(|| message.login_hint.clone())
					.flatten()
			})
			.or_else(|| cookies::last_username(&cookies));

		let (cookies, login_url, anti_forgery) = if local_allowed {
			let (cookies, token) = self.anti_forgery.ensure(cookies);
			let login_url = self
				.route_url("login")
				.tap_mut(|url| {
					url.query_pairs_mut().append_pair("signin", signin);
				})
				.to_string();

			(cookies, Some(login_url), Some(token))
		} else {
			(cookies, None, None)
		};

		let model = LoginViewModel {
			request_id,
			site_name: self.options.site_name.clone(),
			site_url: self.options.site_url.clone(),
			error_message,
			login_url,
			anti_forgery,
			allow_remember_me: local_allowed && self.options.allow_remember_me,
			remember_me: remember_me.unwrap_or(false),
			username,
			external_providers,
			additional_links,
			current_user,
		};

		let html = self.views.login(&model).await?;

		Ok(FlowResponse::Page { cookies, html })
	}

	/// Resolves a partial-login redirect path: absolute URLs pass through,
	/// `~/` and `/` prefixes resolve against the public URL.
	fn resolve_redirect_path(&self, path: &str) -> Result<Url>
	{
		if let Some(rest) = path.strip_prefix("~/") {
			return Ok(self.route_url(rest));
		}

		if let Ok(url) = Url::parse(path) {
			return Ok(url);
		}

		if let Some(rest) = path.strip_prefix('/') {
			return Ok(self.route_url(rest));
		}

		Err(Error::InvalidPartialRedirect)
	}

	/// A URL under the public base URL.
	fn route_url(&self, path: &str) -> Url
	{
		self.options.public_url.clone().tap_mut(|url| {
			url.path_segments_mut()
				.expect("public URL is a base URL")
				.pop_if_empty()
				.extend(path.split('/'));
		})
	}
}

/// Enforces [`MAX_INPUT_PARAM_LENGTH`] on a user-controlled parameter.
fn bounded(value: &str) -> Result<&str>
{
	if value.chars().count() > MAX_INPUT_PARAM_LENGTH {
		return Err(Error::InputTooLong);
	}

	Ok(value)
}
