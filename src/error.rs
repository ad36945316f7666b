//! Crate-level error types shared by the backend collaborators and the HTTP transport.
//!
//! These errors never cross the [`LinkSession`](crate::session::LinkSession) boundary: the
//! session logs them and converts them into a
//! [`SessionFailure`](crate::session::SessionFailure) the caller can render.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by collaborator contracts.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; a fresh attempt may succeed.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Identifier returned by a collaborator failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),

	/// Token endpoint answered without a usable link token.
	#[error("Link token response did not contain a link token.")]
	MissingLinkToken,
	/// Token endpoint returned an expiration that is not RFC 3339.
	#[error("Link token expiration `{value}` is not a valid RFC 3339 timestamp.")]
	InvalidExpiration {
		/// Raw expiration string.
		value: String,
	},
	/// Backend refused the request outright.
	#[error("Backend rejected the request with status {status}: {reason}.")]
	Rejected {
		/// HTTP status (or an equivalent code for in-process backends).
		status: u16,
		/// Backend-supplied reason string.
		reason: String,
	},
}

/// Configuration failures raised while preparing collaborator requests.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request body could not be encoded.
	#[error("Request body could not be encoded.")]
	RequestEncode(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry with a new attempt).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Backend returned a retryable status.
	#[error("{endpoint} endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Endpoint label (`link_token` or `exchange`).
		endpoint: &'static str,
		/// Backend- or crate-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Backend responded with malformed JSON that could not be parsed.
	#[error("{endpoint} endpoint returned malformed JSON.")]
	ResponseParse {
		/// Endpoint label (`link_token` or `exchange`).
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
