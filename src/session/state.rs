//! Pure transition table of a link session.
//!
//! [`SessionState::step`] performs no I/O; [`LinkSession`](crate::session::LinkSession)
//! feeds it the events its collaborators produce and performs the side effects each
//! resulting state calls for.

// self
use crate::{
	_prelude::*,
	auth::{ExchangeReceipt, LinkToken, UserId},
	session::SessionFailure,
};

/// Lifecycle state of one link session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
	/// Nothing requested yet, or the session was torn down.
	#[default]
	Idle,
	/// Link-token request in flight.
	FetchingToken {
		/// User the token is scoped to.
		user: UserId,
	},
	/// Link token available; the control may be activated.
	Ready {
		/// User the token is scoped to.
		user: UserId,
		/// Live link token.
		link_token: LinkToken,
	},
	/// The widget owns the presentation.
	Linking {
		/// User the token is scoped to.
		user: UserId,
		/// Token handed to the widget; kept so a dismissal can return to `Ready`.
		link_token: LinkToken,
	},
	/// Public-token exchange in flight.
	Exchanging {
		/// User the exchange is submitted for.
		user: UserId,
	},
	/// Exchange acknowledged; the session is inert.
	Linked {
		/// Linked user.
		user: UserId,
		/// Backend acknowledgement.
		receipt: ExchangeReceipt,
	},
	/// The current attempt failed; a new `initiate` starts over.
	Failed {
		/// User of the failed attempt.
		user: UserId,
		/// What went wrong.
		failure: SessionFailure,
	},
}
impl SessionState {
	/// Fieldless phase of this state.
	pub fn phase(&self) -> SessionPhase {
		match self {
			SessionState::Idle => SessionPhase::Idle,
			SessionState::FetchingToken { .. } => SessionPhase::FetchingToken,
			SessionState::Ready { .. } => SessionPhase::Ready,
			SessionState::Linking { .. } => SessionPhase::Linking,
			SessionState::Exchanging { .. } => SessionPhase::Exchanging,
			SessionState::Linked { .. } => SessionPhase::Linked,
			SessionState::Failed { .. } => SessionPhase::Failed,
		}
	}

	/// User the session is working for, once initiated.
	pub fn user(&self) -> Option<&UserId> {
		match self {
			SessionState::Idle => None,
			SessionState::FetchingToken { user }
			| SessionState::Ready { user, .. }
			| SessionState::Linking { user, .. }
			| SessionState::Exchanging { user }
			| SessionState::Linked { user, .. }
			| SessionState::Failed { user, .. } => Some(user),
		}
	}

	/// Live link token, if any.
	pub fn link_token(&self) -> Option<&LinkToken> {
		match self {
			SessionState::Ready { link_token, .. } | SessionState::Linking { link_token, .. } =>
				Some(link_token),
			_ => None,
		}
	}

	/// Failure of the last attempt, if the session is in `Failed`.
	pub fn failure(&self) -> Option<&SessionFailure> {
		match self {
			SessionState::Failed { failure, .. } => Some(failure),
			_ => None,
		}
	}

	/// Returns `true` only in `Ready`, the single entry point into `Linking`.
	pub fn is_interactable(&self) -> bool {
		matches!(self, SessionState::Ready { .. })
	}

	/// Computes the state that follows `event`, or reports why the event does not apply.
	pub fn step(&self, event: SessionEvent) -> Result<SessionState, TransitionError> {
		let next = match (self, event) {
			(_, SessionEvent::Teardown) => SessionState::Idle,
			(SessionState::Idle | SessionState::Failed { .. }, SessionEvent::Initiate(user)) =>
				SessionState::FetchingToken { user },
			(SessionState::FetchingToken { user }, SessionEvent::TokenReceived(link_token)) =>
				if link_token.is_blank() {
					let failure = SessionFailure::token_missing();

					SessionState::Failed { user: user.clone(), failure }
				} else {
					SessionState::Ready { user: user.clone(), link_token }
				},
			(SessionState::FetchingToken { user }, SessionEvent::TokenFailed(failure)) =>
				SessionState::Failed { user: user.clone(), failure },
			(SessionState::Ready { user, link_token }, SessionEvent::Activate) =>
				SessionState::Linking { user: user.clone(), link_token: link_token.clone() },
			(SessionState::Linking { user, .. }, SessionEvent::WidgetSucceeded) =>
				SessionState::Exchanging { user: user.clone() },
			(
				SessionState::Linking { user, link_token },
				SessionEvent::WidgetDismissed { at, margin },
			) =>
				if link_token.is_usable_at(at, margin) {
					SessionState::Ready { user: user.clone(), link_token: link_token.clone() }
				} else {
					let failure = SessionFailure::link_expired();

					SessionState::Failed { user: user.clone(), failure }
				},
			(SessionState::Linking { user, .. }, SessionEvent::WidgetFailed(failure)) =>
				SessionState::Failed { user: user.clone(), failure },
			(SessionState::Exchanging { user }, SessionEvent::ExchangeSucceeded(receipt)) =>
				SessionState::Linked { user: user.clone(), receipt },
			(SessionState::Exchanging { user }, SessionEvent::ExchangeFailed(failure)) =>
				SessionState::Failed { user: user.clone(), failure },
			(state, event) =>
				return Err(TransitionError { phase: state.phase(), event: event.label() }),
		};

		Ok(next)
	}
}

/// Fieldless view of [`SessionState`] for labels, logs, and presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
	/// See [`SessionState::Idle`].
	Idle,
	/// See [`SessionState::FetchingToken`].
	FetchingToken,
	/// See [`SessionState::Ready`].
	Ready,
	/// See [`SessionState::Linking`].
	Linking,
	/// See [`SessionState::Exchanging`].
	Exchanging,
	/// See [`SessionState::Linked`].
	Linked,
	/// See [`SessionState::Failed`].
	Failed,
}
impl SessionPhase {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionPhase::Idle => "idle",
			SessionPhase::FetchingToken => "fetching_token",
			SessionPhase::Ready => "ready",
			SessionPhase::Linking => "linking",
			SessionPhase::Exchanging => "exchanging",
			SessionPhase::Linked => "linked",
			SessionPhase::Failed => "failed",
		}
	}
}
impl Display for SessionPhase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Inputs of the transition table.
#[derive(Debug)]
pub enum SessionEvent {
	/// Caller started an attempt for a user.
	Initiate(UserId),
	/// Token provider answered with a token.
	TokenReceived(LinkToken),
	/// Token provider failed.
	TokenFailed(SessionFailure),
	/// Caller pressed the control.
	Activate,
	/// Widget reported success; the public token goes straight to the exchange.
	WidgetSucceeded,
	/// User closed the widget.
	WidgetDismissed {
		/// Instant the dismissal was observed.
		at: OffsetDateTime,
		/// Margin the link token must still have left to be reused.
		margin: Duration,
	},
	/// Widget reported an error.
	WidgetFailed(SessionFailure),
	/// Exchange acknowledged.
	ExchangeSucceeded(ExchangeReceipt),
	/// Exchange failed.
	ExchangeFailed(SessionFailure),
	/// Hosting context released the session.
	Teardown,
}
impl SessionEvent {
	/// Returns a stable label for the event kind.
	pub const fn label(&self) -> &'static str {
		match self {
			SessionEvent::Initiate(_) => "initiate",
			SessionEvent::TokenReceived(_) => "token_received",
			SessionEvent::TokenFailed(_) => "token_failed",
			SessionEvent::Activate => "activate",
			SessionEvent::WidgetSucceeded => "widget_succeeded",
			SessionEvent::WidgetDismissed { .. } => "widget_dismissed",
			SessionEvent::WidgetFailed(_) => "widget_failed",
			SessionEvent::ExchangeSucceeded(_) => "exchange_succeeded",
			SessionEvent::ExchangeFailed(_) => "exchange_failed",
			SessionEvent::Teardown => "teardown",
		}
	}
}

/// Event that does not apply to the current phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Event `{event}` is not valid while the session is {phase}.")]
pub struct TransitionError {
	/// Phase the session was in.
	pub phase: SessionPhase,
	/// Label of the rejected event.
	pub event: &'static str,
}
