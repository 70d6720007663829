//! Request extractors with page-shaped rejections.
//!
//! These routes are driven by browsers, so extractor failures must come
//! back as rendered pages, never as protocol-flavored JSON.

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::request;
use http::StatusCode;
use thiserror::Error;

use super::fallback_error_page;

#[allow(clippy::missing_docs_in_private_items)]
mod base
{
	pub use axum::extract::rejection::FormRejection;
	pub use axum::Form;
	pub use axum_extra::extract::{Query, QueryRejection};
}

/// An extractor for URI query parameters.
///
/// This wraps [`axum_extra::extract::Query`] exactly, but rejects with a
/// generic error page.
#[derive(Debug, axum::extract::FromRequestParts)]
#[from_request(via(base::Query), rejection(PageRejection))]
pub struct Query<T>(pub T);

/// An extractor for form bodies.
///
/// This wraps [`axum::Form`] exactly, but rejects with a generic error
/// page.
#[derive(Debug, axum::extract::FromRequest)]
#[from_request(via(base::Form), rejection(PageRejection))]
pub struct Form<T>(pub T);

/// Rejection for the [`Query`] and [`Form`] extractors.
#[derive(Debug, Error)]
pub enum PageRejection
{
	/// The query string could not be parsed.
	#[error(transparent)]
	Query(#[from] base::QueryRejection),

	/// The form body could not be parsed.
	#[error(transparent)]
	Form(#[from] base::FormRejection),
}

impl IntoResponse for PageRejection
{
	fn into_response(self) -> Response
	{
		tracing::debug!(error = %self, "rejecting malformed request");

		fallback_error_page(StatusCode::BAD_REQUEST)
	}
}

/// The host-assigned correlation id of the current request, if any.
///
/// Hosts running a request-id middleware set `x-request-id`; it gets
/// echoed into the rendered pages for supportability.
#[derive(Debug, Clone)]
pub struct RequestId(pub Option<String>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestId
where
	S: Send + Sync,
{
	type Rejection = std::convert::Infallible;

	async fn from_request_parts(
		req: &mut request::Parts,
		_state: &S,
	) -> Result<Self, Self::Rejection>
	{
		Ok(Self(
			req.headers
				.get("x-request-id")
				.and_then(|value| value.to_str().ok())
				.map(ToOwned::to_owned),
		))
	}
}
