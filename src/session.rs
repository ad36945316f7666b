//! Link-session driver: link-token fetch, widget hand-off, and exactly-once exchange.
//!
//! A [`LinkSession`] wraps the pure [`SessionState`] transition table with the three
//! suspension points of the lifecycle. Every state change happens under a short lock that
//! is never held across `.await`, so each transition is atomic from the caller's point of
//! view. Collaborator errors are logged and folded into [`SessionFailure`]s; nothing is
//! returned as an error or panics across this boundary.
//!
//! Teardown flips a liveness flag. Continuations that resume afterwards discard their
//! results, except that a public token delivered after teardown is still exchanged for the
//! captured user so a completed link is never lost.

pub mod failure;
pub mod state;

pub use failure::*;
pub use state::*;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{ExchangeReceipt, PublicToken, UserId},
	backend::{ExchangeService, TokenProvider},
	obs::{self, SessionSpan, SessionStage, StageOutcome},
	widget::{LinkWidget, WidgetExit, WidgetOutcome},
};

/// Tunables for a [`LinkSession`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Validity a link token must still have for a dismissed widget to return to `Ready`.
	pub expiry_margin: Duration,
}
impl SessionConfig {
	const DEFAULT_EXPIRY_MARGIN: Duration = Duration::seconds(60);

	/// Overrides the expiry margin; negative values are clamped to zero.
	pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
		self.expiry_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}
}
impl Default for SessionConfig {
	fn default() -> Self {
		Self { expiry_margin: Self::DEFAULT_EXPIRY_MARGIN }
	}
}

/// Result of [`LinkSession::initiate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Initiation {
	/// A link token arrived; the session is interactable.
	Ready,
	/// The fetch failed; the session is in `Failed`.
	Failed(SessionFailure),
	/// The session was not in `Idle` or `Failed`; nothing was requested.
	Rejected {
		/// Phase the session was in.
		phase: SessionPhase,
	},
	/// The session was torn down; any result was discarded.
	Detached,
}

/// Result of [`LinkSession::activate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Activation {
	/// The exchange was acknowledged; the session is `Linked`.
	Linked(ExchangeReceipt),
	/// The user closed the widget while the link token was still valid; back in `Ready`.
	Returned,
	/// The attempt failed; the session is in `Failed`.
	Failed(SessionFailure),
	/// The session was not `Ready`; the widget was not opened.
	Rejected {
		/// Phase the session was in.
		phase: SessionPhase,
	},
	/// The session was torn down; any result was discarded.
	Detached,
}

enum ApplyError {
	Closed,
	Rejected(SessionPhase),
}

struct SessionShared {
	state: Mutex<SessionState>,
	alive: AtomicBool,
	submitted: Mutex<HashSet<String>>,
}

/// Cheaply clonable handle to one link session.
///
/// Clones share state, so a host can call [`teardown`](LinkSession::teardown) from one
/// task while another is awaiting [`activate`](LinkSession::activate).
#[derive(Clone)]
pub struct LinkSession {
	shared: Arc<SessionShared>,
	token_provider: Arc<dyn TokenProvider>,
	exchange_service: Arc<dyn ExchangeService>,
	widget: Arc<dyn LinkWidget>,
	config: SessionConfig,
}
impl LinkSession {
	/// Creates an idle session wired to its collaborators.
	pub fn new(
		token_provider: Arc<dyn TokenProvider>,
		exchange_service: Arc<dyn ExchangeService>,
		widget: Arc<dyn LinkWidget>,
	) -> Self {
		Self {
			shared: Arc::new(SessionShared {
				state: Mutex::new(SessionState::Idle),
				alive: AtomicBool::new(true),
				submitted: Default::default(),
			}),
			token_provider,
			exchange_service,
			widget,
			config: SessionConfig::default(),
		}
	}

	/// Creates an idle session backed by one value that plays both server collaborators.
	pub fn with_backend<B>(backend: B, widget: Arc<dyn LinkWidget>) -> Self
	where
		B: 'static + TokenProvider + ExchangeService,
	{
		let backend = Arc::new(backend);

		Self::new(backend.clone(), backend, widget)
	}

	/// Replaces the session configuration.
	pub fn with_config(mut self, config: SessionConfig) -> Self {
		self.config = config;

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Snapshot of the current state.
	pub fn state(&self) -> SessionState {
		self.shared.state.lock().clone()
	}

	/// Current phase.
	pub fn phase(&self) -> SessionPhase {
		self.shared.state.lock().phase()
	}

	/// Returns `false` once [`teardown`](LinkSession::teardown) ran.
	pub fn is_alive(&self) -> bool {
		self.shared.alive.load(Ordering::Acquire)
	}

	/// Requests a fresh link token for `user`.
	///
	/// Accepted only from `Idle` or `Failed`; each accepted call makes exactly one
	/// token-provider request. No retry is performed.
	pub async fn initiate(&self, user: &UserId) -> Initiation {
		const STAGE: SessionStage = SessionStage::FetchToken;

		match self.apply(SessionEvent::Initiate(user.clone())) {
			Ok(_) => {},
			Err(ApplyError::Rejected(phase)) => return Initiation::Rejected { phase },
			Err(ApplyError::Closed) => return Initiation::Detached,
		}

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let span = SessionSpan::new(STAGE, user);
		let event = match span.instrument(self.token_provider.create_link_token(user)).await {
			Ok(link_token) => SessionEvent::TokenReceived(link_token),
			Err(err) => {
				obs::log_stage_error(STAGE, &err);

				SessionEvent::TokenFailed(SessionFailure::from_token_error(&err))
			},
		};

		match self.apply(event) {
			Ok(SessionState::Ready { .. }) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Success);

				Initiation::Ready
			},
			Ok(SessionState::Failed { failure, .. }) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Failure);

				Initiation::Failed(failure)
			},
			Ok(state) => Initiation::Rejected { phase: state.phase() },
			Err(ApplyError::Rejected(phase)) => Initiation::Rejected { phase },
			Err(ApplyError::Closed) => {
				obs::log_discarded(STAGE, "link token fetch completed");
				obs::record_stage_outcome(STAGE, StageOutcome::Discarded);

				Initiation::Detached
			},
		}
	}

	/// Hands the live link token to the widget and, on success, exchanges the public token.
	///
	/// Only valid in `Ready`; any other phase yields [`Activation::Rejected`] without
	/// opening the widget.
	pub async fn activate(&self) -> Activation {
		const STAGE: SessionStage = SessionStage::Link;

		let (user, link_token) = match self.apply(SessionEvent::Activate) {
			Ok(SessionState::Linking { user, link_token }) => (user, link_token),
			Ok(state) => return Activation::Rejected { phase: state.phase() },
			Err(ApplyError::Rejected(phase)) => return Activation::Rejected { phase },
			Err(ApplyError::Closed) => return Activation::Detached,
		};

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let outcome =
			SessionSpan::new(STAGE, &user).instrument(self.widget.open(&link_token)).await;

		drop(link_token);

		match outcome {
			WidgetOutcome::Success(public_token) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Success);

				self.exchange(user, public_token).await
			},
			WidgetOutcome::Exit(exit) => self.close_widget(exit),
		}
	}

	/// Releases the session: drops the live link token and makes in-flight continuations
	/// discard their results. Idempotent.
	pub fn teardown(&self) {
		let mut state = self.shared.state.lock();

		self.shared.alive.store(false, Ordering::Release);

		if let Ok(next) = state.step(SessionEvent::Teardown) {
			*state = next;
		}
	}

	async fn exchange(&self, user: UserId, public_token: PublicToken) -> Activation {
		const STAGE: SessionStage = SessionStage::Exchange;

		let attached = match self.apply(SessionEvent::WidgetSucceeded) {
			Ok(_) => true,
			Err(ApplyError::Closed) => false,
			Err(ApplyError::Rejected(phase)) => return Activation::Rejected { phase },
		};

		if !self.shared.submitted.lock().insert(public_token.fingerprint()) {
			obs::record_stage_outcome(STAGE, StageOutcome::Failure);

			return if attached {
				let failure = SessionFailure::duplicate_public_token();

				self.settle(STAGE, SessionEvent::ExchangeFailed(failure))
			} else {
				Activation::Detached
			};
		}

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = SessionSpan::new(STAGE, &user)
			.instrument(self.exchange_service.exchange(public_token, &user))
			.await;

		if let Err(err) = &result {
			obs::log_stage_error(STAGE, err);
		}
		if !attached {
			obs::log_discarded(STAGE, "exchange completed after teardown");
			obs::record_stage_outcome(STAGE, StageOutcome::Discarded);

			return Activation::Detached;
		}

		let event = match result {
			Ok(receipt) => SessionEvent::ExchangeSucceeded(receipt),
			Err(_) => SessionEvent::ExchangeFailed(SessionFailure::exchange_failed()),
		};

		self.settle(STAGE, event)
	}

	fn close_widget(&self, exit: WidgetExit) -> Activation {
		const STAGE: SessionStage = SessionStage::Link;

		let event = match exit {
			WidgetExit::Dismissed => SessionEvent::WidgetDismissed {
				at: OffsetDateTime::now_utc(),
				margin: self.config.expiry_margin,
			},
			WidgetExit::Errored { code, message } => {
				let failure = SessionFailure::link_errored(&code, &message);

				obs::log_stage_error(STAGE, &failure);

				SessionEvent::WidgetFailed(failure)
			},
		};

		match self.apply(event) {
			Ok(SessionState::Ready { .. }) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Dismissed);

				Activation::Returned
			},
			Ok(SessionState::Failed { failure, .. }) => {
				obs::record_stage_outcome(STAGE, StageOutcome::Failure);

				Activation::Failed(failure)
			},
			Ok(state) => Activation::Rejected { phase: state.phase() },
			Err(ApplyError::Rejected(phase)) => Activation::Rejected { phase },
			Err(ApplyError::Closed) => {
				obs::log_discarded(STAGE, "widget closed after teardown");
				obs::record_stage_outcome(STAGE, StageOutcome::Discarded);

				Activation::Detached
			},
		}
	}

	fn settle(&self, stage: SessionStage, event: SessionEvent) -> Activation {
		match self.apply(event) {
			Ok(SessionState::Linked { receipt, .. }) => {
				obs::record_stage_outcome(stage, StageOutcome::Success);

				Activation::Linked(receipt)
			},
			Ok(SessionState::Failed { failure, .. }) => {
				obs::record_stage_outcome(stage, StageOutcome::Failure);

				Activation::Failed(failure)
			},
			Ok(state) => Activation::Rejected { phase: state.phase() },
			Err(ApplyError::Rejected(phase)) => Activation::Rejected { phase },
			Err(ApplyError::Closed) => {
				obs::log_discarded(stage, "exchange completed after teardown");
				obs::record_stage_outcome(stage, StageOutcome::Discarded);

				Activation::Detached
			},
		}
	}

	fn apply(&self, event: SessionEvent) -> Result<SessionState, ApplyError> {
		let mut state = self.shared.state.lock();

		if !self.is_alive() {
			return Err(ApplyError::Closed);
		}

		let next = state.step(event).map_err(|err| ApplyError::Rejected(err.phase))?;

		*state = next.clone();

		Ok(next)
	}
}
impl Debug for LinkSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LinkSession")
			.field("phase", &self.phase())
			.field("alive", &self.is_alive())
			.field("config", &self.config)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// crates.io
	use tokio::sync::{Notify, oneshot};
	// self
	use super::*;
	use crate::{
		auth::LinkToken,
		backend::{BackendFuture, MemoryBackend},
		widget::{ScriptedWidget, WidgetFuture},
	};

	fn user(id: &str) -> UserId {
		UserId::new(id).expect("User fixture should be valid.")
	}

	/// Token provider that hands out `lt_<n>` and can be told to fail.
	#[derive(Default)]
	struct CountingProvider {
		calls: AtomicUsize,
		fail: AtomicBool,
	}
	impl TokenProvider for CountingProvider {
		fn create_link_token<'a>(&'a self, _user: &'a UserId) -> BackendFuture<'a, LinkToken> {
			Box::pin(async move {
				let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

				if self.fail.load(Ordering::SeqCst) {
					return Err(Error::Rejected { status: 503, reason: "unavailable".into() });
				}

				let expires_at = OffsetDateTime::now_utc() + Duration::hours(4);

				Ok(LinkToken::new(format!("lt_{n}"), expires_at))
			})
		}
	}

	/// Exchange service that records every submission.
	#[derive(Default)]
	struct RecordingExchange {
		submitted: Mutex<Vec<(String, UserId)>>,
		fail: AtomicBool,
	}
	impl ExchangeService for RecordingExchange {
		fn exchange<'a>(
			&'a self,
			public_token: PublicToken,
			user: &'a UserId,
		) -> BackendFuture<'a, ExchangeReceipt> {
			Box::pin(async move {
				self.submitted.lock().push((public_token.expose().to_owned(), user.clone()));

				if self.fail.load(Ordering::SeqCst) {
					let reason = "INVALID_PUBLIC_TOKEN".into();

					return Err(Error::Rejected { status: 400, reason });
				}

				Ok(ExchangeReceipt::now())
			})
		}
	}

	/// Widget whose single outcome is delivered by the test through a channel.
	struct ChannelWidget {
		opened: Notify,
		outcome: Mutex<Option<oneshot::Receiver<WidgetOutcome>>>,
	}
	impl LinkWidget for ChannelWidget {
		fn open<'a>(&'a self, _link_token: &'a LinkToken) -> WidgetFuture<'a> {
			Box::pin(async move {
				let receiver = self.outcome.lock().take();

				self.opened.notify_one();

				match receiver {
					Some(receiver) =>
						receiver.await.unwrap_or(WidgetOutcome::Exit(WidgetExit::Dismissed)),
					None => WidgetOutcome::Exit(WidgetExit::Dismissed),
				}
			})
		}
	}

	/// Exchange service that parks inside the call until the test releases it.
	struct GatedExchange {
		entered: Notify,
		release: Mutex<Option<oneshot::Receiver<()>>>,
		calls: AtomicUsize,
	}
	impl ExchangeService for GatedExchange {
		fn exchange<'a>(
			&'a self,
			_public_token: PublicToken,
			_user: &'a UserId,
		) -> BackendFuture<'a, ExchangeReceipt> {
			Box::pin(async move {
				let release = self.release.lock().take();

				self.calls.fetch_add(1, Ordering::SeqCst);
				self.entered.notify_one();

				if let Some(release) = release {
					let _ = release.await;
				}

				Ok(ExchangeReceipt::now())
			})
		}
	}

	struct Fixture {
		provider: Arc<CountingProvider>,
		exchange: Arc<RecordingExchange>,
		widget: Arc<ScriptedWidget>,
		session: LinkSession,
	}
	impl Fixture {
		fn new() -> Self {
			let provider = Arc::new(CountingProvider::default());
			let exchange = Arc::new(RecordingExchange::default());
			let widget = Arc::new(ScriptedWidget::default());
			let session = LinkSession::new(provider.clone(), exchange.clone(), widget.clone());

			Self { provider, exchange, widget, session }
		}
	}

	#[tokio::test]
	async fn scenario_links_u1_with_a_single_exchange() {
		let fx = Fixture::new();
		let u1 = user("u1");

		assert_eq!(fx.session.initiate(&u1).await, Initiation::Ready);
		assert_eq!(fx.session.phase(), SessionPhase::Ready);

		fx.widget.succeed_with("pub_abc");

		assert!(matches!(fx.session.activate().await, Activation::Linked(_)));
		assert_eq!(fx.session.phase(), SessionPhase::Linked);
		assert_eq!(*fx.exchange.submitted.lock(), vec![("pub_abc".to_owned(), u1)]);
		assert_eq!(
			fx.session.activate().await,
			Activation::Rejected { phase: SessionPhase::Linked }
		);
		assert_eq!(fx.widget.open_count(), 1);
	}

	#[tokio::test]
	async fn token_failure_blocks_activation_until_reinitiated() {
		let fx = Fixture::new();
		let u1 = user("u1");

		fx.provider.fail.store(true, Ordering::SeqCst);

		let initiation = fx.session.initiate(&u1).await;

		assert_eq!(initiation, Initiation::Failed(SessionFailure::token_fetch_failed()));
		assert_eq!(
			fx.session.state().failure().map(|failure| failure.reason),
			Some(FailureReason::TokenUnavailable)
		);
		assert_eq!(
			fx.session.activate().await,
			Activation::Rejected { phase: SessionPhase::Failed }
		);
		assert_eq!(fx.widget.open_count(), 0);
		assert!(fx.exchange.submitted.lock().is_empty());

		fx.provider.fail.store(false, Ordering::SeqCst);

		assert_eq!(fx.session.initiate(&u1).await, Initiation::Ready);
		assert_eq!(fx.provider.calls.load(Ordering::SeqCst), 2);
		assert_eq!(
			fx.session.state().link_token().map(|token| token.expose().to_owned()),
			Some("lt_2".to_owned())
		);
	}

	#[tokio::test]
	async fn initiate_is_rejected_while_a_token_is_live() {
		let fx = Fixture::new();
		let u1 = user("u1");

		assert_eq!(fx.session.initiate(&u1).await, Initiation::Ready);
		assert_eq!(
			fx.session.initiate(&u1).await,
			Initiation::Rejected { phase: SessionPhase::Ready }
		);
		assert_eq!(fx.provider.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn dismissal_reuses_the_same_link_token() {
		let fx = Fixture::new();

		fx.session.initiate(&user("u1")).await;
		fx.widget.dismiss().succeed_with("pub_abc");

		assert_eq!(fx.session.activate().await, Activation::Returned);
		assert_eq!(fx.session.phase(), SessionPhase::Ready);
		assert!(matches!(fx.session.activate().await, Activation::Linked(_)));

		let opened = fx.widget.opened();

		assert_eq!(opened.len(), 2);
		assert_eq!(opened[0], opened[1]);
		assert_eq!(fx.provider.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn dismissal_inside_the_margin_fails_the_attempt() {
		let fx = Fixture::new();
		let session = fx.session.clone().with_config(
			SessionConfig::default().with_expiry_margin(Duration::hours(5)),
		);

		session.initiate(&user("u1")).await;

		assert_eq!(session.activate().await, Activation::Failed(SessionFailure::link_expired()));
	}

	#[tokio::test]
	async fn widget_errors_and_exchange_failures_surface_as_state() {
		let fx = Fixture::new();
		let u1 = user("u1");

		fx.session.initiate(&u1).await;
		fx.widget.fail_with("INSTITUTION_DOWN", "The bank is unavailable.");

		let Activation::Failed(failure) = fx.session.activate().await else {
			panic!("Widget errors should fail the attempt.");
		};

		assert_eq!(failure.reason, FailureReason::LinkAborted);

		fx.exchange.fail.store(true, Ordering::SeqCst);
		fx.session.initiate(&u1).await;
		fx.widget.succeed_with("pub_abc");

		assert_eq!(
			fx.session.activate().await,
			Activation::Failed(SessionFailure::exchange_failed())
		);
		assert_eq!(fx.exchange.submitted.lock().len(), 1);
	}

	#[tokio::test]
	async fn a_public_token_is_never_submitted_twice() {
		let fx = Fixture::new();
		let u1 = user("u1");

		fx.exchange.fail.store(true, Ordering::SeqCst);
		fx.session.initiate(&u1).await;
		fx.widget.succeed_with("pub_abc");
		fx.session.activate().await;
		fx.exchange.fail.store(false, Ordering::SeqCst);
		fx.session.initiate(&u1).await;
		fx.widget.succeed_with("pub_abc");

		assert_eq!(
			fx.session.activate().await,
			Activation::Failed(SessionFailure::duplicate_public_token())
		);
		assert_eq!(fx.exchange.submitted.lock().len(), 1);
	}

	#[tokio::test]
	async fn activate_is_rejected_while_an_exchange_is_in_flight() {
		let (release, gate) = oneshot::channel();
		let exchange = Arc::new(GatedExchange {
			entered: Notify::new(),
			release: Mutex::new(Some(gate)),
			calls: AtomicUsize::new(0),
		});
		let widget = Arc::new(ScriptedWidget::default());
		let provider = Arc::new(CountingProvider::default());
		let session = LinkSession::new(provider, exchange.clone(), widget.clone());

		session.initiate(&user("u1")).await;
		widget.succeed_with("pub_abc").succeed_with("pub_other");

		let pending = tokio::spawn({
			let session = session.clone();

			async move { session.activate().await }
		});

		exchange.entered.notified().await;

		assert_eq!(session.phase(), SessionPhase::Exchanging);
		assert_eq!(
			session.clone().activate().await,
			Activation::Rejected { phase: SessionPhase::Exchanging }
		);
		assert_eq!(widget.open_count(), 1);

		release.send(()).expect("Exchange should still be parked.");

		let activation = pending.await.expect("Activation task should not panic.");

		assert!(matches!(activation, Activation::Linked(_)));
		assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn success_after_teardown_still_exchanges_and_is_discarded() {
		let provider = Arc::new(CountingProvider::default());
		let exchange = Arc::new(RecordingExchange::default());
		let (sender, receiver) = oneshot::channel();
		let widget = Arc::new(ChannelWidget {
			opened: Notify::new(),
			outcome: Mutex::new(Some(receiver)),
		});
		let session = LinkSession::new(provider, exchange.clone(), widget.clone());
		let u1 = user("u1");

		session.initiate(&u1).await;

		let pending = tokio::spawn({
			let session = session.clone();

			async move { session.activate().await }
		});

		widget.opened.notified().await;
		session.teardown();

		assert_eq!(session.phase(), SessionPhase::Idle);
		assert!(session.state().link_token().is_none());

		sender
			.send(WidgetOutcome::Success(PublicToken::new("pub_late")))
			.expect("Widget receiver should still be waiting.");

		let activation = pending.await.expect("Activation task should not panic.");

		assert_eq!(activation, Activation::Detached);
		assert_eq!(*exchange.submitted.lock(), vec![("pub_late".to_owned(), u1.clone())]);
		assert_eq!(session.phase(), SessionPhase::Idle);
		assert_eq!(session.initiate(&u1).await, Initiation::Detached);
	}

	#[tokio::test]
	async fn memory_backend_round_trip() {
		let backend = MemoryBackend::default();
		let widget = Arc::new(ScriptedWidget::default());
		let session = LinkSession::with_backend(backend.clone(), widget.clone());
		let u1 = user("u1");

		assert_eq!(session.initiate(&u1).await, Initiation::Ready);

		let link_token =
			session.state().link_token().cloned().expect("Ready sessions hold a link token.");
		let public_token =
			backend.complete_link(&link_token).expect("Issued link tokens should complete.");

		widget.push(WidgetOutcome::Success(public_token));

		let Activation::Linked(receipt) = session.activate().await else {
			panic!("Memory backend exchange should link the account.");
		};
		let stored = backend.credentials_for(&u1);

		assert_eq!(stored.len(), 1);
		assert_eq!(receipt.item_id.as_ref(), Some(&stored[0].item_id));
	}
}
