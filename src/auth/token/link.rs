//! Short-lived link tokens that authorize one interactive linking session.

// self
use crate::{_prelude::*, auth::token::secret::Secret};

/// Link token issued by a [`TokenProvider`](crate::backend::TokenProvider) for one user.
///
/// The aggregator enforces one-time use; locally the token is only checked against its
/// expiry instant so a dismissed widget can be reopened while the token is still good.
#[derive(Clone, PartialEq, Eq)]
pub struct LinkToken {
	secret: Secret,
	/// Instant after which the aggregator no longer accepts the token.
	pub expires_at: OffsetDateTime,
}
impl LinkToken {
	/// Wraps a token value together with its expiry instant.
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { secret: Secret::new(value), expires_at }
	}

	/// Returns the raw token for the widget hand-off. Callers must avoid logging it.
	pub fn expose(&self) -> &str {
		self.secret.expose()
	}

	/// Returns `true` when the token carries no usable value.
	pub fn is_blank(&self) -> bool {
		self.secret.is_blank()
	}

	/// Non-reversible digest of the token value.
	pub fn fingerprint(&self) -> String {
		self.secret.fingerprint()
	}

	/// Checks whether the token remains usable at `instant`, keeping `margin` in reserve so
	/// a widget reopened at the edge of the window does not fail inside the aggregator.
	pub fn is_usable_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		let margin = if margin.is_negative() { Duration::ZERO } else { margin };

		instant + margin < self.expires_at
	}
}
impl Debug for LinkToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LinkToken")
			.field("secret", &self.secret)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
