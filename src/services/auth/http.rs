//! HTTP handlers for this service.

use axum::extract::State;
use axum::{routing, Router};
use axum_extra::extract::CookieJar;

use super::models::{
	CallbackQuery,
	ExternalQuery,
	LoginForm,
	LogoutForm,
	LogoutQuery,
	ResumeQuery,
	SignInQuery,
};
use super::{AuthService, FlowResponse};
use crate::http::extract::{Form, Query, RequestId};

impl From<AuthService> for Router
{
	fn from(svc: AuthService) -> Self
	{
		Router::new()
			.route("/login", routing::get(login_page).post(login))
			.route("/external", routing::get(external))
			.route("/callback", routing::get(callback))
			.route("/resume", routing::get(resume))
			.route("/logout", routing::get(logout_page).post(logout))
			.with_state(svc)
	}
}

/// Renders the login page for a pending sign-in flow, or short-circuits it
/// when policy already knows the answer.
#[tracing::instrument(skip_all)]
#[utoipa::path(get, path = "/login", tag = "Authentication", params(SignInQuery), responses(
	(status = 200, description = "the login page"),
	(status = 302, description = "the flow was decided without a page"),
))]
async fn login_page(
	State(svc): State<AuthService>,
	RequestId(request_id): RequestId,
	cookies: CookieJar,
	Query(query): Query<SignInQuery>,
) -> FlowResponse
{
	match svc
		.show_login(cookies, request_id.clone(), query.signin.as_deref())
		.await
	{
		Ok(response) => response,
		Err(error) => svc.error_response(request_id, error).await,
	}
}

/// Validates submitted local credentials.
#[tracing::instrument(skip_all)]
#[utoipa::path(post, path = "/login", tag = "Authentication", params(SignInQuery), responses(
	(status = 302, description = "signed in"),
	(status = 200, description = "the login page, with errors"),
	(status = 405, description = "local login is disabled"),
))]
async fn login(
	State(svc): State<AuthService>,
	RequestId(request_id): RequestId,
	cookies: CookieJar,
	Query(query): Query<SignInQuery>,
	Form(form): Form<LoginForm>,
) -> FlowResponse
{
	match svc
		.submit_login(cookies, request_id.clone(), query.signin.as_deref(), form)
		.await
	{
		Ok(response) => response,
		Err(error) => svc.error_response(request_id, error).await,
	}
}

/// Starts a federated login by challenging an external provider.
#[tracing::instrument(skip_all)]
#[utoipa::path(get, path = "/external", tag = "Authentication", params(ExternalQuery), responses(
	(status = 401, description = "challenge; rewritten into the provider redirect"),
))]
async fn external(
	State(svc): State<AuthService>,
	RequestId(request_id): RequestId,
	cookies: CookieJar,
	Query(query): Query<ExternalQuery>,
) -> FlowResponse
{
	match svc
		.external_challenge(cookies, query.signin.as_deref(), query.provider.as_deref())
		.await
	{
		Ok(response) => response,
		Err(error) => svc.error_response(request_id, error).await,
	}
}

/// Hit by the host middleware after an external provider sent the browser
/// back.
#[tracing::instrument(skip_all)]
#[utoipa::path(get, path = "/callback", tag = "Authentication", params(CallbackQuery))]
async fn callback(
	State(svc): State<AuthService>,
	RequestId(request_id): RequestId,
	cookies: CookieJar,
	Query(query): Query<CallbackQuery>,
) -> FlowResponse
{
	match svc
		.external_callback(cookies, request_id.clone(), query.error)
		.await
	{
		Ok(response) => response,
		Err(error) => svc.error_response(request_id, error).await,
	}
}

/// Re-enters a suspended sign-in after the subject finished the missing
/// step.
#[tracing::instrument(skip_all)]
#[utoipa::path(get, path = "/resume", tag = "Authentication", params(ResumeQuery))]
async fn resume(
	State(svc): State<AuthService>,
	RequestId(request_id): RequestId,
	cookies: CookieJar,
	Query(query): Query<ResumeQuery>,
) -> FlowResponse
{
	match svc
		.resume_login(cookies, request_id.clone(), query.resume.as_deref())
		.await
	{
		Ok(response) => response,
		Err(error) => svc.error_response(request_id, error).await,
	}
}

/// Renders the sign-out prompt, or signs out immediately when no prompt is
/// due.
#[tracing::instrument(skip_all)]
#[utoipa::path(get, path = "/logout", tag = "Authentication", params(LogoutQuery))]
async fn logout_page(
	State(svc): State<AuthService>,
	RequestId(request_id): RequestId,
	cookies: CookieJar,
	Query(query): Query<LogoutQuery>,
) -> FlowResponse
{
	match svc
		.show_logout(cookies, request_id.clone(), query.id.as_deref())
		.await
	{
		Ok(response) => response,
		Err(error) => svc.error_response(request_id, error).await,
	}
}

/// Signs the browser out.
#[tracing::instrument(skip_all)]
#[utoipa::path(post, path = "/logout", tag = "Authentication", params(LogoutQuery))]
async fn logout(
	State(svc): State<AuthService>,
	RequestId(request_id): RequestId,
	cookies: CookieJar,
	Query(query): Query<LogoutQuery>,
	Form(form): Form<LogoutForm>,
) -> FlowResponse
{
	match svc
		.submit_logout(cookies, request_id.clone(), query.id.as_deref(), form)
		.await
	{
		Ok(response) => response,
		Err(error) => svc.error_response(request_id, error).await,
	}
}
