//! Durable access credentials and the receipts a session gets back instead of them.

// self
use crate::{
	_prelude::*,
	auth::{ItemId, UserId, token::secret::Secret},
};

/// Durable credential minted from a public token.
///
/// Only the exchange side holds these; a [`LinkSession`](crate::session::LinkSession) sees
/// an [`ExchangeReceipt`] instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
	/// User the credential was exchanged for.
	pub user: UserId,
	/// Aggregator item the credential grants access to.
	pub item_id: ItemId,
	/// Access token secret; callers must avoid logging it.
	pub access_token: Secret,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
}
impl AccessCredential {
	/// Non-secret receipt describing this credential.
	pub fn receipt(&self) -> ExchangeReceipt {
		ExchangeReceipt { item_id: Some(self.item_id.clone()), exchanged_at: self.issued_at }
	}
}

/// Acknowledgement returned by a successful exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeReceipt {
	/// Linked item, when the backend reports one.
	pub item_id: Option<ItemId>,
	/// Instant the exchange was acknowledged.
	pub exchanged_at: OffsetDateTime,
}
impl ExchangeReceipt {
	/// Receipt stamped with the current instant and no item identifier.
	pub fn now() -> Self {
		Self { item_id: None, exchanged_at: OffsetDateTime::now_utc() }
	}

	/// Attaches the linked item identifier.
	pub fn with_item_id(mut self, item_id: ItemId) -> Self {
		self.item_id = Some(item_id);

		self
	}
}
