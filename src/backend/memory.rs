//! In-process backend that plays both server collaborators for local development and tests.
//!
//! [`MemoryBackend`] issues random link tokens, stands in for the aggregator through
//! [`MemoryBackend::complete_link`], and redeems public tokens into [`AccessCredential`]s
//! it keeps per user. Redemption is idempotent: resubmitting a redeemed public token for
//! the same user returns the first receipt instead of minting a second credential.
//!
//! Link tokens and unredeemed public tokens are dropped from the ledger once they expire.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::{AccessCredential, ExchangeReceipt, ItemId, LinkToken, PublicToken, Secret, UserId},
	backend::{BackendDescriptor, BackendFuture, ExchangeService, TokenProvider},
};

const TOKEN_LEN: usize = 32;
const ITEM_LEN: usize = 16;

#[derive(Debug)]
struct Issued {
	user: UserId,
	expires_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct Ledger {
	issued: HashMap<String, Issued>,
	pending: HashMap<String, Issued>,
	redeemed: HashMap<String, AccessCredential>,
	credentials: HashMap<UserId, Vec<AccessCredential>>,
}
impl Ledger {
	fn prune_expired(&mut self, now: OffsetDateTime) {
		self.issued.retain(|_, issued| issued.expires_at > now);
		self.pending.retain(|_, pending| pending.expires_at > now);
	}
}

#[derive(Debug, Default)]
struct Counters {
	link_tokens: AtomicU64,
	exchanges: AtomicU64,
}

/// Thread-safe backend that keeps every token and credential in process memory.
///
/// Every ledger mutation happens under one write lock with no `.await` inside, so
/// concurrent redemptions of the same public token settle on a single credential.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
	ledger: Arc<RwLock<Ledger>>,
	counters: Arc<Counters>,
	link_token_ttl: Duration,
	public_token_ttl: Duration,
}
impl MemoryBackend {
	/// Aggregators commonly accept a public token for thirty minutes.
	pub const DEFAULT_PUBLIC_TOKEN_TTL: Duration = Duration::minutes(30);

	/// Overrides how long issued link tokens stay valid.
	pub fn with_link_token_ttl(mut self, ttl: Duration) -> Self {
		self.link_token_ttl = ttl;

		self
	}

	/// Overrides how long a completed link's public token can be exchanged.
	pub fn with_public_token_ttl(mut self, ttl: Duration) -> Self {
		self.public_token_ttl = ttl;

		self
	}

	/// Plays the aggregator's role: turns a link token the user completed into a public
	/// token. Each link token can be completed once, and only before it expires.
	pub fn complete_link(&self, link_token: &LinkToken) -> Result<PublicToken> {
		let now = OffsetDateTime::now_utc();
		let mut ledger = self.ledger.write();
		let issued = ledger.issued.remove(&link_token.fingerprint()).ok_or_else(|| {
			Error::Rejected { status: 400, reason: "INVALID_LINK_TOKEN".into() }
		})?;

		ledger.prune_expired(now);

		if now >= issued.expires_at {
			return Err(Error::Rejected { status: 400, reason: "LINK_TOKEN_EXPIRED".into() });
		}

		let public_token = PublicToken::new(format!("public-sandbox-{}", random_string(TOKEN_LEN)));

		ledger.pending.insert(
			public_token.fingerprint(),
			Issued { user: issued.user, expires_at: now + self.public_token_ttl },
		);

		Ok(public_token)
	}

	/// Credentials stored for `user`, oldest first.
	pub fn credentials_for(&self, user: &UserId) -> Vec<AccessCredential> {
		self.ledger.read().credentials.get(user).cloned().unwrap_or_default()
	}

	/// Number of link-token requests served so far.
	pub fn link_token_requests(&self) -> u64 {
		self.counters.link_tokens.load(Ordering::Relaxed)
	}

	/// Number of exchange requests received so far, duplicates included.
	pub fn exchange_requests(&self) -> u64 {
		self.counters.exchanges.load(Ordering::Relaxed)
	}

	fn issue_now(&self, user: &UserId) -> LinkToken {
		let now = OffsetDateTime::now_utc();
		let expires_at = now + self.link_token_ttl;
		let token =
			LinkToken::new(format!("link-sandbox-{}", random_string(TOKEN_LEN)), expires_at);
		let mut ledger = self.ledger.write();

		ledger.prune_expired(now);
		ledger.issued.insert(token.fingerprint(), Issued { user: user.clone(), expires_at });

		token
	}

	fn redeem_now(&self, fingerprint: String, user: &UserId) -> Result<ExchangeReceipt> {
		let now = OffsetDateTime::now_utc();
		let mut ledger = self.ledger.write();

		if let Some(existing) = ledger.redeemed.get(&fingerprint) {
			return if &existing.user == user {
				Ok(existing.receipt())
			} else {
				Err(Error::Rejected { status: 400, reason: "INVALID_PUBLIC_TOKEN".into() })
			};
		}

		ledger.prune_expired(now);

		match ledger.pending.get(&fingerprint) {
			Some(pending) if &pending.user == user => {},
			_ => return Err(Error::Rejected { status: 400, reason: "INVALID_PUBLIC_TOKEN".into() }),
		}

		ledger.pending.remove(&fingerprint);

		let credential = AccessCredential {
			user: user.clone(),
			item_id: ItemId::new(format!("item-{}", random_string(ITEM_LEN)))?,
			access_token: Secret::new(format!("access-sandbox-{}", random_string(TOKEN_LEN))),
			issued_at: now,
		};
		let receipt = credential.receipt();

		ledger.credentials.entry(user.clone()).or_default().push(credential.clone());
		ledger.redeemed.insert(fingerprint, credential);

		Ok(receipt)
	}
}
impl Default for MemoryBackend {
	fn default() -> Self {
		Self {
			ledger: Default::default(),
			counters: Default::default(),
			link_token_ttl: BackendDescriptor::DEFAULT_LINK_TOKEN_TTL,
			public_token_ttl: Self::DEFAULT_PUBLIC_TOKEN_TTL,
		}
	}
}
impl TokenProvider for MemoryBackend {
	fn create_link_token<'a>(&'a self, user: &'a UserId) -> BackendFuture<'a, LinkToken> {
		Box::pin(async move {
			self.counters.link_tokens.fetch_add(1, Ordering::Relaxed);

			Ok(self.issue_now(user))
		})
	}
}
impl ExchangeService for MemoryBackend {
	fn exchange<'a>(
		&'a self,
		public_token: PublicToken,
		user: &'a UserId,
	) -> BackendFuture<'a, ExchangeReceipt> {
		Box::pin(async move {
			self.counters.exchanges.fetch_add(1, Ordering::Relaxed);

			self.redeem_now(public_token.fingerprint(), user)
		})
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn user(id: &str) -> UserId {
		UserId::new(id).expect("User fixture should be valid.")
	}

	#[tokio::test]
	async fn link_tokens_are_fresh_per_call() {
		let backend = MemoryBackend::default();
		let u1 = user("u1");
		let first = backend.create_link_token(&u1).await.expect("First link token should issue.");
		let second =
			backend.create_link_token(&u1).await.expect("Second link token should issue.");

		assert_ne!(first.expose(), second.expose());
		assert!(first.expose().starts_with("link-sandbox-"));
		assert_eq!(backend.link_token_requests(), 2);
	}

	#[tokio::test]
	async fn exchange_persists_one_credential_and_is_idempotent() {
		let backend = MemoryBackend::default();
		let u1 = user("u1");
		let link = backend.create_link_token(&u1).await.expect("Link token should issue.");
		let public = backend.complete_link(&link).expect("Issued link token should complete.");
		let duplicate = PublicToken::new(public.expose());
		let first = backend.exchange(public, &u1).await.expect("Exchange should succeed.");
		let second =
			backend.exchange(duplicate, &u1).await.expect("Duplicate submission should be safe.");

		assert_eq!(first, second);
		assert_eq!(backend.exchange_requests(), 2);

		let stored = backend.credentials_for(&u1);

		assert_eq!(stored.len(), 1);
		assert_eq!(Some(&stored[0].item_id), first.item_id.as_ref());
		assert!(stored[0].access_token.expose().starts_with("access-sandbox-"));
	}

	#[tokio::test]
	async fn link_tokens_complete_once_and_public_tokens_stay_with_their_user() {
		let backend = MemoryBackend::default();
		let u1 = user("u1");
		let link = backend.create_link_token(&u1).await.expect("Link token should issue.");
		let public = backend.complete_link(&link).expect("Issued link token should complete.");

		assert!(matches!(backend.complete_link(&link), Err(Error::Rejected { status: 400, .. })));

		let err = backend
			.exchange(public, &user("u2"))
			.await
			.expect_err("Another user must not redeem the public token.");

		assert!(matches!(err, Error::Rejected { status: 400, .. }));
		assert!(backend.credentials_for(&u1).is_empty());
	}

	#[tokio::test]
	async fn expired_link_tokens_cannot_complete() {
		let backend = MemoryBackend::default().with_link_token_ttl(Duration::seconds(-1));
		let link =
			backend.create_link_token(&user("u1")).await.expect("Link token should issue.");
		let err = backend.complete_link(&link).expect_err("Expired link token should be refused.");

		assert!(matches!(
			err,
			Error::Rejected { ref reason, .. } if reason == "LINK_TOKEN_EXPIRED"
		));
	}

	#[tokio::test]
	async fn unknown_public_tokens_are_rejected() {
		let backend = MemoryBackend::default();
		let err = backend
			.exchange(PublicToken::new("public-forged"), &user("u1"))
			.await
			.expect_err("Unknown public tokens must be rejected.");

		assert!(matches!(err, Error::Rejected { .. }));
	}

	#[tokio::test]
	async fn expired_tokens_are_pruned_from_the_ledger() {
		let backend = MemoryBackend::default().with_link_token_ttl(Duration::seconds(-1));
		let u1 = user("u1");

		for _ in 0..3 {
			backend.create_link_token(&u1).await.expect("Link token should issue.");
		}

		assert_eq!(backend.ledger.read().issued.len(), 1);

		let backend = MemoryBackend::default().with_public_token_ttl(Duration::seconds(-1));
		let link = backend.create_link_token(&u1).await.expect("Link token should issue.");
		let public = backend.complete_link(&link).expect("Issued link token should complete.");

		assert_eq!(backend.ledger.read().pending.len(), 1);

		backend.create_link_token(&u1).await.expect("Link token should issue.");

		assert!(backend.ledger.read().pending.is_empty());

		let err = backend
			.exchange(public, &u1)
			.await
			.expect_err("Expired public tokens must not be redeemed.");

		assert!(matches!(
			err,
			Error::Rejected { ref reason, .. } if reason == "INVALID_PUBLIC_TOKEN"
		));
		assert!(backend.credentials_for(&u1).is_empty());
	}

	#[tokio::test]
	async fn concurrent_redemptions_mint_a_single_credential() {
		let backend = MemoryBackend::default();
		let u1 = user("u1");
		let link = backend.create_link_token(&u1).await.expect("Link token should issue.");
		let public = backend.complete_link(&link).expect("Issued link token should complete.");
		let duplicate = PublicToken::new(public.expose());
		let (first, second) =
			tokio::join!(backend.exchange(public, &u1), backend.exchange(duplicate, &u1));

		assert_eq!(
			first.expect("First redemption should succeed."),
			second.expect("Second redemption should return the same receipt.")
		);
		assert_eq!(backend.credentials_for(&u1).len(), 1);
	}
}
