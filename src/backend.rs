//! Server-side collaborators a link session talks to, plus their configuration.
//!
//! [`TokenProvider`] issues link tokens and [`ExchangeService`] trades public tokens for
//! durable credentials. Both are object-safe so a session can hold them behind `Arc<dyn _>`
//! regardless of whether they are backed by HTTP ([`crate::http::HttpLinkBackend`]) or the
//! in-process [`MemoryBackend`].

pub mod descriptor;
pub mod memory;

pub use descriptor::*;
pub use memory::MemoryBackend;

// self
use crate::{
	_prelude::*,
	auth::{ExchangeReceipt, LinkToken, PublicToken, UserId},
};

/// Boxed future returned by collaborator calls.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Issues short-lived link tokens scoped to one user.
///
/// Every call must yield a fresh token; implementations keep no per-caller state. A
/// response without a usable token is reported as [`Error::MissingLinkToken`].
pub trait TokenProvider
where
	Self: Send + Sync,
{
	/// Requests a new link token for `user`.
	fn create_link_token<'a>(&'a self, user: &'a UserId) -> BackendFuture<'a, LinkToken>;
}

/// Exchanges a public token for a durable access credential persisted server-side.
pub trait ExchangeService
where
	Self: Send + Sync,
{
	/// Submits `public_token` on behalf of `user`, consuming the token.
	fn exchange<'a>(
		&'a self,
		public_token: PublicToken,
		user: &'a UserId,
	) -> BackendFuture<'a, ExchangeReceipt>;
}
