//! Widget that replays queued outcomes, for headless hosts, demos, and tests.

// self
use crate::{
	_prelude::*,
	auth::{LinkToken, PublicToken},
	widget::{LinkWidget, WidgetExit, WidgetFuture, WidgetOutcome},
};

/// [`LinkWidget`] that answers each `open` with the next queued outcome.
///
/// An empty queue behaves like a user closing the widget. Every opened link token is
/// recorded by fingerprint so callers can assert which token a session handed over.
#[derive(Clone, Debug, Default)]
pub struct ScriptedWidget {
	script: Arc<Mutex<VecDeque<WidgetOutcome>>>,
	opened: Arc<Mutex<Vec<String>>>,
}
impl ScriptedWidget {
	/// Queues an outcome.
	pub fn push(&self, outcome: WidgetOutcome) -> &Self {
		self.script.lock().push_back(outcome);

		self
	}

	/// Queues a successful link producing `public_token`.
	pub fn succeed_with(&self, public_token: impl Into<String>) -> &Self {
		self.push(WidgetOutcome::Success(PublicToken::new(public_token)))
	}

	/// Queues a user dismissal.
	pub fn dismiss(&self) -> &Self {
		self.push(WidgetOutcome::Exit(WidgetExit::Dismissed))
	}

	/// Queues a widget error.
	pub fn fail_with(&self, code: impl Into<String>, message: impl Into<String>) -> &Self {
		self.push(WidgetOutcome::Exit(WidgetExit::errored(code, message)))
	}

	/// Fingerprints of the link tokens the widget was opened with, in order.
	pub fn opened(&self) -> Vec<String> {
		self.opened.lock().clone()
	}

	/// Number of times the widget was opened.
	pub fn open_count(&self) -> usize {
		self.opened.lock().len()
	}
}
impl LinkWidget for ScriptedWidget {
	fn open<'a>(&'a self, link_token: &'a LinkToken) -> WidgetFuture<'a> {
		Box::pin(async move {
			self.opened.lock().push(link_token.fingerprint());

			self.script.lock().pop_front().unwrap_or(WidgetOutcome::Exit(WidgetExit::Dismissed))
		})
	}
}
