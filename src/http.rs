//! reqwest-backed implementation of both server collaborators.
//!
//! [`HttpLinkBackend`] posts JSON to the two endpoints of a [`BackendDescriptor`]:
//!
//! - link token: `{"user", "clientName", "products", "countryCodes", "language"}` →
//!   `{"linkToken", "expiration"?}`
//! - exchange: `{"publicToken", "user"}` → any 2xx, optionally `{"itemId"}`; an unreadable
//!   body still acknowledges the exchange
//!
//! Responses are decoded through `serde_path_to_error` so malformed payloads report the
//! offending path. 408, 429, and 5xx answers are classified as transient and keep the
//! `Retry-After` hint; other non-success statuses become [`Error::Rejected`].

// crates.io
use reqwest::{
	StatusCode,
	header::{ACCEPT, CONTENT_TYPE, HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use serde::de::DeserializeOwned;
use time::format_description::well_known::{Rfc2822, Rfc3339};
// self
use crate::{
	_prelude::*,
	auth::{ExchangeReceipt, ItemId, LinkToken, PublicToken, UserId},
	backend::{BackendDescriptor, BackendFuture, ExchangeService, LinkProfile, TokenProvider},
	error::{ConfigError, TransientError, TransportError},
	obs,
};

const LINK_TOKEN_ENDPOINT: &str = "link_token";
const EXCHANGE_ENDPOINT: &str = "exchange";
const REASON_PREVIEW_LEN: usize = 200;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkTokenRequest<'a> {
	user: &'a UserId,
	#[serde(flatten)]
	profile: &'a LinkProfile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkTokenResponse {
	#[serde(default, alias = "link_token")]
	link_token: Option<String>,
	#[serde(default)]
	expiration: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
	public_token: &'a str,
	user: &'a UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeResponse {
	#[serde(default, alias = "item_id")]
	item_id: Option<String>,
}

/// HTTP client for the application backend.
///
/// The inner client should not follow redirects: both endpoints answer directly, and a
/// redirect would replay the public token against another URI. [`HttpLinkBackend::new`]
/// configures that; callers supplying their own client via
/// [`HttpLinkBackend::with_client`] must do the same.
#[derive(Clone, Debug)]
pub struct HttpLinkBackend {
	client: ReqwestClient,
	descriptor: BackendDescriptor,
}
impl HttpLinkBackend {
	/// Builds a backend with a redirect-free reqwest client.
	pub fn new(descriptor: BackendDescriptor) -> Result<Self> {
		let client =
			ReqwestClient::builder().redirect(Policy::none()).build().map_err(ConfigError::from)?;

		Ok(Self::with_client(client, descriptor))
	}

	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient, descriptor: BackendDescriptor) -> Self {
		Self { client, descriptor }
	}

	/// Descriptor the backend was built from.
	pub fn descriptor(&self) -> &BackendDescriptor {
		&self.descriptor
	}

	async fn post_json(
		&self,
		endpoint: &'static str,
		url: &Url,
		payload: Vec<u8>,
	) -> Result<(StatusCode, Vec<u8>)> {
		let response = self
			.client
			.post(url.clone())
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json")
			.body(payload)
			.send()
			.await
			.map_err(|err| map_reqwest_error(endpoint, err))?;
		let status = response.status();
		let retry_after = parse_retry_after(response.headers());
		let body = response.bytes().await.map_err(|err| map_reqwest_error(endpoint, err))?.to_vec();

		if status.is_success() {
			Ok((status, body))
		} else {
			Err(map_status_error(endpoint, status, retry_after, &body))
		}
	}
}
impl TokenProvider for HttpLinkBackend {
	fn create_link_token<'a>(&'a self, user: &'a UserId) -> BackendFuture<'a, LinkToken> {
		Box::pin(async move {
			let payload =
				serde_json::to_vec(&LinkTokenRequest { user, profile: &self.descriptor.profile })
					.map_err(ConfigError::from)?;
			let (status, body) = self
				.post_json(LINK_TOKEN_ENDPOINT, &self.descriptor.endpoints.link_token, payload)
				.await?;
			let response = if is_blank(&body) {
				None
			} else {
				parse_json::<Option<LinkTokenResponse>>(LINK_TOKEN_ENDPOINT, status, &body)?
			};
			let LinkTokenResponse { link_token, expiration } =
				response.ok_or(Error::MissingLinkToken)?;
			let value =
				link_token.filter(|value| !value.trim().is_empty()).ok_or(Error::MissingLinkToken)?;
			let expires_at = match expiration {
				Some(raw) => OffsetDateTime::parse(&raw, &Rfc3339)
					.map_err(|_| Error::InvalidExpiration { value: raw.clone() })?,
				None => OffsetDateTime::now_utc() + self.descriptor.link_token_ttl,
			};

			Ok(LinkToken::new(value, expires_at))
		})
	}
}
impl ExchangeService for HttpLinkBackend {
	fn exchange<'a>(
		&'a self,
		public_token: PublicToken,
		user: &'a UserId,
	) -> BackendFuture<'a, ExchangeReceipt> {
		Box::pin(async move {
			let payload = serde_json::to_vec(&ExchangeRequest {
				public_token: public_token.expose(),
				user,
			})
			.map_err(ConfigError::from)?;

			drop(public_token);

			let (status, body) = self
				.post_json(EXCHANGE_ENDPOINT, &self.descriptor.endpoints.exchange, payload)
				.await?;
			let receipt = ExchangeReceipt::now();

			// Any 2xx spends the public token; the body only decorates the receipt.
			Ok(match receipt_item_id(status, &body) {
				Some(item_id) => receipt.with_item_id(item_id),
				None => receipt,
			})
		})
	}
}

fn receipt_item_id(status: StatusCode, body: &[u8]) -> Option<ItemId> {
	if is_blank(body) {
		return None;
	}

	let raw = match parse_json::<Option<ExchangeResponse>>(EXCHANGE_ENDPOINT, status, body) {
		Ok(response) => response?.item_id?,
		Err(err) => {
			obs::log_unreadable_receipt(&err);

			return None;
		},
	};

	ItemId::new(raw).inspect_err(|err| obs::log_unreadable_receipt(err)).ok()
}

fn is_blank(body: &[u8]) -> bool {
	body.iter().all(u8::is_ascii_whitespace)
}

fn parse_json<T>(endpoint: &'static str, status: StatusCode, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TransientError::ResponseParse { endpoint, source, status: Some(status.as_u16()) }.into()
	})
}

fn map_status_error(
	endpoint: &'static str,
	status: StatusCode,
	retry_after: Option<Duration>,
	body: &[u8],
) -> Error {
	let reason = error_reason(body);

	if status == StatusCode::REQUEST_TIMEOUT
		|| status == StatusCode::TOO_MANY_REQUESTS
		|| status.is_server_error()
	{
		TransientError::Endpoint {
			endpoint,
			message: reason,
			status: Some(status.as_u16()),
			retry_after,
		}
		.into()
	} else {
		Error::Rejected { status: status.as_u16(), reason }
	}
}

fn map_reqwest_error(endpoint: &'static str, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Endpoint {
			endpoint,
			message: "Request timed out".into(),
			status: err.status().map(|code| code.as_u16()),
			retry_after: None,
		}
		.into();
	}

	TransportError::from(err).into()
}

fn error_reason(body: &[u8]) -> String {
	let structured = serde_json::from_slice::<serde_json::Value>(body).ok().and_then(|value| {
		["error_message", "errorMessage", "message", "error_code", "error"]
			.iter()
			.find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
			.filter(|reason| !reason.trim().is_empty())
			.map(ToOwned::to_owned)
	});

	if let Some(reason) = structured {
		return reason;
	}

	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() {
		"no response body".into()
	} else {
		text.chars().take(REASON_PREVIEW_LEN).collect()
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return (secs >= 0).then(|| Duration::seconds(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
