//! One-time public tokens emitted by the aggregator widget.

// self
use crate::{_prelude::*, auth::token::secret::Secret};

/// Public token produced by a successful interactive link.
///
/// Not `Clone`: [`ExchangeService::exchange`](crate::backend::ExchangeService::exchange)
/// takes it by value, so a session can hand each token to the backend only once.
#[derive(PartialEq, Eq)]
pub struct PublicToken(Secret);
impl PublicToken {
	/// Wraps the value the widget reported.
	pub fn new(value: impl Into<String>) -> Self {
		Self(Secret::new(value))
	}

	/// Returns the raw token for the exchange request. Callers must avoid logging it.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// Non-reversible digest used to recognize duplicate submissions.
	pub fn fingerprint(&self) -> String {
		self.0.fingerprint()
	}
}
impl Debug for PublicToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("PublicToken").field(&"<redacted>").finish()
	}
}
