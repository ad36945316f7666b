//! Failure taxonomy surfaced by a session instead of errors.

// self
use crate::_prelude::*;

/// Why a session attempt ended in `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
	/// Link-token fetch failed or returned no token.
	TokenUnavailable,
	/// The widget errored, or was dismissed after the link token expired.
	LinkAborted,
	/// The backend rejected the exchange or the call never completed.
	ExchangeFailed,
}
impl FailureReason {
	/// Returns the stable reason string exposed to callers.
	pub const fn as_str(self) -> &'static str {
		match self {
			FailureReason::TokenUnavailable => "token_unavailable",
			FailureReason::LinkAborted => "link_aborted",
			FailureReason::ExchangeFailed => "exchange_failed",
		}
	}
}
impl Display for FailureReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Terminal failure of one session attempt, with a user-facing message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("{reason}: {message}")]
pub struct SessionFailure {
	/// Machine-readable reason.
	pub reason: FailureReason,
	/// Message suitable for an error banner.
	pub message: String,
}
impl SessionFailure {
	/// Creates a failure with an explicit message.
	pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
		Self { reason, message: message.into() }
	}

	/// The token endpoint answered without a usable token.
	pub fn token_missing() -> Self {
		Self::new(FailureReason::TokenUnavailable, "Unable to get link token.")
	}

	/// The token request itself failed.
	pub fn token_fetch_failed() -> Self {
		Self::new(FailureReason::TokenUnavailable, "Error fetching link token.")
	}

	/// Maps a token-provider error onto the matching failure.
	pub fn from_token_error(error: &Error) -> Self {
		match error {
			Error::MissingLinkToken => Self::token_missing(),
			_ => Self::token_fetch_failed(),
		}
	}

	/// The widget was dismissed after the link token could no longer be reused.
	pub fn link_expired() -> Self {
		Self::new(FailureReason::LinkAborted, "Link session expired.")
	}

	/// The widget reported an error.
	pub fn link_errored(code: &str, message: &str) -> Self {
		let message = if message.trim().is_empty() {
			format!("Bank linking was cancelled ({code}).")
		} else {
			format!("Bank linking was cancelled: {message}")
		};

		Self::new(FailureReason::LinkAborted, message)
	}

	/// The exchange call failed.
	pub fn exchange_failed() -> Self {
		Self::new(FailureReason::ExchangeFailed, "Unable to link bank account.")
	}

	/// The widget produced a public token this session already submitted.
	pub fn duplicate_public_token() -> Self {
		Self::new(FailureReason::ExchangeFailed, "Public token was already submitted.")
	}
}
