//! Civic Sync
//!
//! Client-side core of the issue-reporting portal: keeps each report
//! conversation and the actor's notification list consistent with the
//! server while push events arrive, and gates report status and assignment
//! changes before they reach the network.

pub mod api;
pub mod assignment;
pub mod cache;
pub mod conversation;
pub mod error;
pub mod hub;
pub mod identity;
pub mod lifecycle;
pub mod messages;
pub mod notifications;
pub mod reports;

#[cfg(test)]
pub(crate) mod testing;

pub use api::PortalApi;
pub use error::{ClientError, ValidationError};
