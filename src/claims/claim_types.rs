//! Claim type constants.
//!
//! The short names follow the OpenID Connect standard claims where one
//! exists; the `partial-login.*` family is internal bookkeeping used to
//! suspend and resume multi-step logins.

/// Unique identifier of the subject.
pub const SUBJECT: &str = "sub";

/// Human-readable display name.
pub const NAME: &str = "name";

/// How the subject authenticated (`password`, `external`, …).
pub const AUTHENTICATION_METHOD: &str = "amr";

/// Unix timestamp of the moment the subject authenticated.
pub const AUTHENTICATION_TIME: &str = "auth_time";

/// Which identity provider authenticated the subject.
pub const IDENTITY_PROVIDER: &str = "idp";

/// The claim set a fully signed-in principal must carry.
pub const FULL_SIGN_IN: [&str; 5] = [
	SUBJECT,
	NAME,
	AUTHENTICATION_METHOD,
	AUTHENTICATION_TIME,
	IDENTITY_PROVIDER,
];

/// Absolute URL a suspended login will resume at. Present only on partial
/// sign-in principals.
pub const PARTIAL_LOGIN_RETURN_URL: &str = "partial-login.return-url";

/// The subject identifier at an external provider. The claim's issuer is
/// the provider's scheme name and its value the provider-local id.
pub const EXTERNAL_PROVIDER_USER_ID: &str = "external-provider-user-id";

/// Prefix of the per-continuation resume claim type; see
/// [`partial_login_resume_id`].
const PARTIAL_LOGIN_RESUME_ID_PREFIX: &str = "partial-login.resume-id:";

/// Formats the claim type naming a partial-login continuation.
///
/// The resume id parametrizes both this claim type and the resume URL, so
/// the formatting here must stay in lockstep with the URL the flow
/// controller hands out: the claim's value is the originating sign-in id,
/// and the claim is found again by formatting the `resume` query parameter
/// through this same function.
pub fn partial_login_resume_id(resume_id: &str) -> String
{
	format!("{PARTIAL_LOGIN_RESUME_ID_PREFIX}{resume_id}")
}

/// The three bookkeeping claim types a full sign-in must not carry.
///
/// The resume-id member is per-continuation; use
/// [`partial_login_resume_id`] to name it.
pub const fn bookkeeping() -> [&'static str; 2]
{
	[PARTIAL_LOGIN_RETURN_URL, EXTERNAL_PROVIDER_USER_ID]
}
