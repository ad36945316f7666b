//! Optional observability helpers for link sessions.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `bank_link.session` with a `stage` field, plus
//!   `warn!` events whenever a collaborator call fails.
//! - Enable `metrics` to increment the `bank_link_session_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Suspension points of a link session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionStage {
	/// Link-token request to the token provider.
	FetchToken,
	/// Hand-off to the aggregator widget.
	Link,
	/// Public-token exchange.
	Exchange,
}
impl SessionStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionStage::FetchToken => "fetch_token",
			SessionStage::Link => "link",
			SessionStage::Exchange => "exchange",
		}
	}
}
impl Display for SessionStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Stage entered.
	Attempt,
	/// Stage completed successfully.
	Success,
	/// Stage failed; the session moved to `Failed`.
	Failure,
	/// The user closed the widget and the session returned to `Ready`.
	Dismissed,
	/// Result arrived after teardown and was dropped.
	Discarded,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
			StageOutcome::Dismissed => "dismissed",
			StageOutcome::Discarded => "discarded",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
