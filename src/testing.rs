//! Test doubles and an in-process harness.
//!
//! Everything here drives the real flow controller against scripted
//! collaborators: a [`StubUserService`] with canned outcomes, a recording
//! event sink, a marker-emitting view service, and a [`Browser`] that
//! carries cookies between [`tower::ServiceExt::oneshot`]-style requests
//! the way a real browser would.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::async_trait;
use axum::body::Body;
use axum::response::Html;
use axum::Router;
use axum_extra::extract::cookie::Key;
use axum_extra::extract::CookieJar;
use cookie::Cookie;
use http::{header, Method, Request, Response};
use time::OffsetDateTime;

use crate::bridge::{CookieHostBridge, ExternalProvider, HostAuthBridge};
use crate::claims::ClaimsPrincipal;
use crate::config::{AuthOptions, CookieConfig};
use crate::messages::{CookieMessageStore, MessageStore, SignInMessage, SignOutMessage};
use crate::services::auth::{AuthService, AuthServices};
use crate::services::clients::{Client, InMemoryClientStore};
use crate::services::events::{Event, EventService};
use crate::services::users::{self, AuthenticateResult, ExternalIdentity, UserService};
use crate::services::views::{
	self,
	ErrorViewModel,
	LoggedOutViewModel,
	LoginViewModel,
	LogoutViewModel,
	NoSignOutUrls,
	ViewService,
};

/// A [`UserService`] with canned outcomes.
///
/// Every authenticate-family call is counted, which is what the "nothing
/// was consulted" assertions hang off of.
#[derive(Debug, Default)]
pub struct StubUserService
{
	/// Outcome of `pre_authenticate`; `None` means "proceed normally".
	pre_authenticate: Mutex<Option<AuthenticateResult>>,

	/// Outcome of `authenticate_local`; `None` means "rejected".
	authenticate_local: Mutex<Option<AuthenticateResult>>,

	/// Outcome of `authenticate_external`; `None` means "no match".
	authenticate_external: Mutex<Option<AuthenticateResult>>,

	/// Number of authenticate-family calls made.
	calls: AtomicUsize,

	/// Username/password pairs `authenticate_local` saw.
	local_attempts: Mutex<Vec<(String, String)>>,

	/// Subjects `sign_out` saw.
	signed_out: Mutex<Vec<Option<String>>>,
}

impl StubUserService
{
	/// A service that rejects everything.
	pub fn new() -> Self
	{
		Self::default()
	}

	/// Scripts the `pre_authenticate` outcome.
	pub fn pre_authenticate_with(self, result: AuthenticateResult) -> Self
	{
		*self.pre_authenticate.lock().expect("stub lock poisoned") = Some(result);
		self
	}

	/// Scripts the `authenticate_local` outcome.
	pub fn local_with(self, result: AuthenticateResult) -> Self
	{
		*self.authenticate_local.lock().expect("stub lock poisoned") = Some(result);
		self
	}

	/// Scripts the `authenticate_external` outcome.
	pub fn external_with(self, result: AuthenticateResult) -> Self
	{
		*self.authenticate_external.lock().expect("stub lock poisoned") = Some(result);
		self
	}

	/// How many authenticate-family calls were made.
	pub fn calls(&self) -> usize
	{
		self.calls.load(Ordering::SeqCst)
	}

	/// The username/password pairs `authenticate_local` saw.
	pub fn local_attempts(&self) -> Vec<(String, String)>
	{
		self.local_attempts.lock().expect("stub lock poisoned").clone()
	}

	/// The subjects `sign_out` saw.
	pub fn signed_out(&self) -> Vec<Option<String>>
	{
		self.signed_out.lock().expect("stub lock poisoned").clone()
	}
}

#[async_trait]
impl UserService for StubUserService
{
	async fn pre_authenticate(&self, _message: &SignInMessage)
		-> users::Result<Option<AuthenticateResult>>
	{
		self.calls.fetch_add(1, Ordering::SeqCst);

		Ok(self.pre_authenticate.lock().expect("stub lock poisoned").clone())
	}

	async fn authenticate_local(
		&self,
		username: &str,
		password: &str,
		_message: &SignInMessage,
	) -> users::Result<Option<AuthenticateResult>>
	{
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.local_attempts
			.lock()
			.expect("stub lock poisoned")
			.push((username.to_owned(), password.to_owned()));

		Ok(self.authenticate_local.lock().expect("stub lock poisoned").clone())
	}

	async fn authenticate_external(
		&self,
		_identity: &ExternalIdentity,
		_message: &SignInMessage,
	) -> users::Result<Option<AuthenticateResult>>
	{
		self.calls.fetch_add(1, Ordering::SeqCst);

		Ok(self
			.authenticate_external
			.lock()
			.expect("stub lock poisoned")
			.clone())
	}

	async fn sign_out(&self, principal: &ClaimsPrincipal) -> users::Result<()>
	{
		self.signed_out
			.lock()
			.expect("stub lock poisoned")
			.push(principal.subject().map(ToOwned::to_owned));

		Ok(())
	}
}

/// An [`EventService`] that remembers everything it was given.
#[derive(Debug, Default)]
pub struct RecordingEventService
{
	/// The raised events, in order.
	events: Mutex<Vec<Event>>,
}

impl RecordingEventService
{
	/// Creates an empty recorder.
	pub fn new() -> Self
	{
		Self::default()
	}

	/// The events raised so far, in order.
	pub fn events(&self) -> Vec<Event>
	{
		self.events.lock().expect("recorder lock poisoned").clone()
	}
}

#[async_trait]
impl EventService for RecordingEventService
{
	async fn raise(&self, event: Event)
	{
		self.events.lock().expect("recorder lock poisoned").push(event);
	}
}

/// A [`ViewService`] that renders bare pages with machine-readable
/// markers, so tests can assert on *which* page rendered and with what,
/// without a template engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainViewService;

#[async_trait]
impl ViewService for PlainViewService
{
	async fn login(&self, model: &LoginViewModel) -> views::Result<Html<String>>
	{
		let providers = model
			.external_providers
			.iter()
			.map(|link| format!(r#"<a class="provider" href="{}">{}</a>"#, link.href, link.text))
			.collect::<String>();

		Ok(Html(format!(
			r#"<!doctype html><html><body><main data-page="login" data-error="{error}" data-username="{username}" data-remember-me="{remember_me}">{providers}</main></body></html>"#,
			error = model.error_message.as_deref().unwrap_or_default(),
			username = model.username.as_deref().unwrap_or_default(),
			remember_me = model.remember_me,
		)))
	}

	async fn logout(&self, model: &LogoutViewModel) -> views::Result<Html<String>>
	{
		Ok(Html(format!(
			r#"<!doctype html><html><body><main data-page="logout" data-logout-url="{}"></main></body></html>"#,
			model.logout_url,
		)))
	}

	async fn logged_out(&self, model: &LoggedOutViewModel) -> views::Result<Html<String>>
	{
		let iframes = model
			.iframe_urls
			.iter()
			.map(|url| format!(r#"<iframe src="{url}"></iframe>"#))
			.collect::<String>();

		Ok(Html(format!(
			r#"<!doctype html><html><body><main data-page="logged-out" data-client="{client}" data-redirect-url="{redirect}">{iframes}</main></body></html>"#,
			client = model.client_name.as_deref().unwrap_or_default(),
			redirect = model
				.redirect_url
				.as_ref()
				.map(ToString::to_string)
				.unwrap_or_default(),
		)))
	}

	async fn error(&self, model: &ErrorViewModel) -> views::Result<Html<String>>
	{
		Ok(Html(format!(
			r#"<!doctype html><html><body><main data-page="error" data-message="{}"></main></body></html>"#,
			model.error_message,
		)))
	}
}

/// Builder for an [`AuthService`] wired to test doubles and cookie-backed
/// stores.
#[allow(clippy::missing_docs_in_private_items)]
pub struct Harness
{
	options: AuthOptions,
	cookie_config: CookieConfig,
	users: Arc<StubUserService>,
	clients: Vec<Client>,
	providers: Vec<ExternalProvider>,
}

/// Creates a [`Harness`] with permissive defaults.
pub fn harness() -> Harness
{
	Harness {
		options: AuthOptions::default(),
		cookie_config: CookieConfig::default(),
		users: Arc::new(StubUserService::new()),
		clients: Vec::new(),
		providers: Vec::new(),
	}
}

impl Harness
{
	/// Replaces the options.
	pub fn options(mut self, options: AuthOptions) -> Self
	{
		self.options = options;
		self
	}

	/// Replaces the cookie configuration.
	pub fn cookie_config(mut self, config: CookieConfig) -> Self
	{
		self.cookie_config = config;
		self
	}

	/// Replaces the user service.
	pub fn users(mut self, users: StubUserService) -> Self
	{
		self.users = Arc::new(users);
		self
	}

	/// Registers a client.
	pub fn client(mut self, client: Client) -> Self
	{
		self.clients.push(client);
		self
	}

	/// Registers an external provider on the host.
	pub fn provider(mut self, provider: ExternalProvider) -> Self
	{
		self.providers.push(provider);
		self
	}

	/// Builds just the [`AuthService`].
	pub fn build(self) -> AuthService
	{
		self.build_server().svc
	}

	/// Builds the full test server.
	pub fn build_server(self) -> TestServer
	{
		let key = Key::generate();
		let messages = Arc::new(CookieMessageStore::new(key.clone(), self.cookie_config.clone()));
		let bridge = Arc::new(CookieHostBridge::new(
			key.clone(),
			self.cookie_config.clone(),
			self.providers,
		));
		let events = Arc::new(RecordingEventService::new());

		let svc = AuthService::new(self.options, self.cookie_config, AuthServices {
			users: Arc::clone(&self.users) as Arc<dyn UserService>,
			clients: Arc::new(InMemoryClientStore::new(self.clients)),
			views: Arc::new(PlainViewService),
			events: Arc::clone(&events) as Arc<dyn EventService>,
			bridge: Arc::clone(&bridge) as Arc<dyn HostAuthBridge>,
			sign_in_messages: Arc::clone(&messages) as Arc<dyn MessageStore<SignInMessage>>,
			sign_out_messages: Arc::clone(&messages) as Arc<dyn MessageStore<SignOutMessage>>,
			sign_out_urls: Arc::new(NoSignOutUrls),
		});

		TestServer {
			router: Router::from(svc.clone()),
			svc,
			users: self.users,
			events,
			bridge,
			messages,
		}
	}
}

/// An assembled flow controller plus handles onto its collaborators.
#[allow(clippy::missing_docs_in_private_items)]
pub struct TestServer
{
	pub svc: AuthService,
	pub router: Router,
	pub users: Arc<StubUserService>,
	pub events: Arc<RecordingEventService>,
	pub bridge: Arc<CookieHostBridge>,
	pub messages: Arc<CookieMessageStore>,
}

impl TestServer
{
	/// Parks a sign-in message under `id` in the given browser, as the
	/// authorize endpoint would have.
	pub fn park_sign_in(&self, browser: &mut Browser, id: &str, message: &SignInMessage)
	{
		let jar = crate::messages::MessageStore::<SignInMessage>::put(
			&*self.messages,
			CookieJar::new(),
			id,
			message,
		)
		.expect("parking a sign-in message should succeed");

		browser.adopt(&jar);
	}

	/// Parks a sign-out message under `id` in the given browser.
	pub fn park_sign_out(&self, browser: &mut Browser, id: &str, message: &SignOutMessage)
	{
		let jar = crate::messages::MessageStore::<SignOutMessage>::put(
			&*self.messages,
			CookieJar::new(),
			id,
			message,
		)
		.expect("parking a sign-out message should succeed");

		browser.adopt(&jar);
	}

	/// Seeds an identity under a scheme in the given browser, as the host
	/// framework would have.
	pub fn seed_identity(&self, browser: &mut Browser, scheme: &str, principal: &ClaimsPrincipal)
	{
		use crate::bridge::{HostAuthBridge, SignInProperties};

		let jar = self
			.bridge
			.sign_in(CookieJar::new(), scheme, principal, &SignInProperties::session())
			.expect("seeding an identity should succeed");

		browser.adopt(&jar);
	}
}

/// A cookie-carrying fake browser for driving the router.
#[derive(Debug, Default)]
pub struct Browser
{
	/// Current cookies, by name.
	cookies: BTreeMap<String, String>,
}

impl Browser
{
	/// A browser with no cookies.
	pub fn new() -> Self
	{
		Self::default()
	}

	/// Builds a GET request carrying the browser's cookies.
	pub fn get(&self, uri: &str) -> Request<Body>
	{
		self.request(Method::GET, uri, Body::empty(), None)
	}

	/// Builds a form POST carrying the browser's cookies.
	pub fn post(&self, uri: &str, form: &str) -> Request<Body>
	{
		self.request(
			Method::POST,
			uri,
			Body::from(form.to_owned()),
			Some("application/x-www-form-urlencoded"),
		)
	}

	/// Applies a response's `Set-Cookie` headers, honoring removals.
	pub fn apply<B>(&mut self, response: &Response<B>)
	{
		for value in response.headers().get_all(header::SET_COOKIE) {
			let Ok(raw) = value.to_str() else { continue };
			let Ok(cookie) = Cookie::parse_encoded(raw.to_owned()) else { continue };

			let removed = cookie.value().is_empty()
				|| cookie
					.expires_datetime()
					.is_some_and(|expires| expires <= OffsetDateTime::now_utc());

			if removed {
				self.cookies.remove(cookie.name());
			} else {
				self.cookies
					.insert(cookie.name().to_owned(), cookie.value().to_owned());
			}
		}
	}

	/// Copies every cookie of a jar into the browser.
	pub fn adopt(&mut self, jar: &CookieJar)
	{
		for cookie in jar.iter() {
			self.cookies
				.insert(cookie.name().to_owned(), cookie.value().to_owned());
		}
	}

	/// Sets a cookie directly.
	pub fn set(&mut self, name: &str, value: &str)
	{
		self.cookies.insert(name.to_owned(), value.to_owned());
	}

	/// The value of a cookie, if the browser holds it.
	pub fn cookie(&self, name: &str) -> Option<&str>
	{
		self.cookies.get(name).map(String::as_str)
	}

	/// Whether the browser holds a cookie of this name.
	pub fn has(&self, name: &str) -> bool
	{
		self.cookies.contains_key(name)
	}

	/// The browser's cookies as a jar, for talking to the cookie-backed
	/// stores directly.
	pub fn jar(&self) -> CookieJar
	{
		self.cookies
			.iter()
			.fold(CookieJar::new(), |jar, (name, value)| {
				jar.add(Cookie::new(name.clone(), value.clone()))
			})
	}

	#[allow(clippy::missing_docs_in_private_items)]
	fn request(
		&self,
		method: Method,
		uri: &str,
		body: Body,
		content_type: Option<&str>,
	) -> Request<Body>
	{
		let mut builder = Request::builder().method(method).uri(uri);

		if !self.cookies.is_empty() {
			let cookies = self
				.cookies
				.iter()
				.map(|(name, value)| format!("{name}={value}"))
				.collect::<Vec<_>>()
				.join("; ");

			builder = builder.header(header::COOKIE, cookies);
		}

		if let Some(content_type) = content_type {
			builder = builder.header(header::CONTENT_TYPE, content_type);
		}

		builder.body(body).expect("request should be well-formed")
	}
}
