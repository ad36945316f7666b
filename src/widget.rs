//! Capability interface for the aggregator's interactive link widget.
//!
//! The widget is an external, host-controlled black box. A session hands it a
//! [`LinkToken`] and awaits a single [`WidgetOutcome`]: resolving one future per
//! [`LinkWidget::open`] call is how "exactly one terminal callback" is expressed here.
//! Hosts whose widget reports through callbacks bridge them into that future.

pub mod scripted;

pub use scripted::ScriptedWidget;

// self
use crate::{
	_prelude::*,
	auth::{LinkToken, PublicToken},
};

/// Boxed future returned by [`LinkWidget::open`].
pub type WidgetFuture<'a> = Pin<Box<dyn Future<Output = WidgetOutcome> + 'a + Send>>;

/// Host-provided handle that opens the aggregator widget.
pub trait LinkWidget
where
	Self: Send + Sync,
{
	/// Presents the widget for `link_token` and resolves with its terminal outcome.
	fn open<'a>(&'a self, link_token: &'a LinkToken) -> WidgetFuture<'a>;
}

/// Terminal outcome of one widget session.
#[derive(Debug)]
pub enum WidgetOutcome {
	/// The user linked an account; carries the one-time public token.
	Success(PublicToken),
	/// The widget closed without producing a public token.
	Exit(WidgetExit),
}

/// Reason the widget closed without success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WidgetExit {
	/// The user closed the widget.
	Dismissed,
	/// The widget failed (institution outage, invalid token, internal error).
	Errored {
		/// Aggregator error code, e.g. `INVALID_LINK_TOKEN`.
		code: String,
		/// Human-readable description.
		message: String,
	},
}
impl WidgetExit {
	/// Convenience constructor for [`WidgetExit::Errored`].
	pub fn errored(code: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Errored { code: code.into(), message: message.into() }
	}
}
