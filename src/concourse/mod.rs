//! Concourse CI API access: password-grant login and the two read-only
//! endpoints the dashboard needs.

mod auth;
mod client;
mod types;

pub use auth::TokenAcquirer;
pub use client::ConcourseClient;
pub use types::{Build, BuildStatus, ResourceVersion};
