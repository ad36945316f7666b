// self
use crate::{_prelude::*, obs::SessionStage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// A span builder used around session stages.
#[derive(Clone, Debug)]
pub struct SessionSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl SessionSpan {
	/// Creates a new span tagged with the stage and the session's user.
	pub fn new(stage: SessionStage, user: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("bank_link.session", stage = stage.as_str(), user);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, user);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a failed collaborator call; the error itself never leaves the session.
pub fn log_stage_error(stage: SessionStage, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(stage = stage.as_str(), error = %error, "Collaborator call failed.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, error);
	}
}

/// Logs a result that arrived after the session was torn down.
pub fn log_discarded(stage: SessionStage, detail: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(stage = stage.as_str(), detail, "Session torn down; result discarded.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, detail);
	}
}

/// Logs an acknowledged exchange whose response body could not be read for an item id.
pub fn log_unreadable_receipt(detail: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			stage = SessionStage::Exchange.as_str(),
			detail = %detail,
			"Exchange acknowledged; item id ignored."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = detail;
	}
}
