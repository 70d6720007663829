//! The services composing the authentication endpoint.
//!
//! [`auth`] is the flow controller itself and owns the HTTP routes; the
//! sibling modules define the pluggable collaborators it drives: credential
//! policy ([`users`]), client metadata ([`clients`]), page rendering
//! ([`views`]), and the event sink ([`events`]).

pub mod auth;
pub use auth::AuthService;

pub mod users;
pub use users::UserService;

pub mod clients;
pub use clients::ClientStore;

pub mod views;
pub use views::ViewService;

pub mod events;
pub use events::EventService;
