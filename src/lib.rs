//! The interactive authentication endpoint of an OAuth2 / OpenID Connect
//! identity provider.
//!
//! This crate implements the HTTP-visible subsystem that drives a browser
//! through local credential validation, federated (external) identity
//! provider login, partial / multi-step login resumption, and sign-out. It
//! sits between an upstream protocol layer (the authorize endpoint, which
//! persists a sign-in message and redirects the browser here), a pluggable
//! [`UserService`] that validates credentials, a set of external identity
//! providers reached through a [`HostAuthBridge`], and a [`ViewService`]
//! that renders the login / logout / error pages.
//!
//! All state that survives between requests lives in short-lived signed
//! cookies, addressed by per-flow identifiers, so any number of concurrent
//! flows per browser are supported and no server-side session storage is
//! required.
//!
//! The entry point is [`AuthService`]; convert it into an [`axum::Router`]
//! and nest it under the identity server's base path:
//!
//! ```ignore
//! let router = axum::Router::new().nest("/auth", svc.into());
//! ```
//!
//! [`UserService`]: services::users::UserService
//! [`HostAuthBridge`]: bridge::HostAuthBridge
//! [`ViewService`]: services::views::ViewService

pub mod claims;

mod config;
pub use config::{AuthOptions, CookieConfig};

pub mod cookies;
pub mod localization;
pub mod messages;
pub mod bridge;

pub mod http;
pub mod services;
pub use services::auth::AuthService;

pub mod testing;

#[cfg(test)]
mod tests;
