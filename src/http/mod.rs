//! HTTP-level building blocks shared by the handlers.

use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;

pub mod extract;

/// A last-resort error page, used where the configured view service cannot
/// be reached (extractor rejections) or has itself failed. Carries no
/// request-derived data.
pub(crate) fn fallback_error_page(status: StatusCode) -> Response
{
	(
		status,
		Html(String::from(
			"<!DOCTYPE html><html><body><h1>There was an unexpected error</h1></body></html>",
		)),
	)
		.into_response()
}
