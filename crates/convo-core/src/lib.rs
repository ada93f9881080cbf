//! Read-state, digest and account-merge engines for Convo.
//!
//! Everything here is driven through a [`Services`] value that carries the
//! store and the outbound collaborators (mail, search, notifications).

pub mod clients;
mod container;
mod context;
pub mod digest;
mod error;
pub mod merge;
pub mod messages;
pub mod reads;
pub mod users;

#[cfg(test)]
mod testing;

pub use clients::{MailClient, Notification, NotificationClient, SearchClient};
pub use context::Services;
pub use digest::{DigestItem, DigestOutcome, Digestable};
pub use error::CoreError;
