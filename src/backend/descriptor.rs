//! Backend descriptor describing where link tokens come from and where public tokens go.

/// Builder API for assembling backend descriptors.
pub mod builder;
/// Link-token request profile sent to the token endpoint.
pub mod profile;

pub use builder::*;
pub use profile::*;

// self
use crate::_prelude::*;

/// Endpoint pair exposed by the application backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEndpoints {
	/// Endpoint that creates link tokens.
	pub link_token: Url,
	/// Endpoint that exchanges public tokens.
	pub exchange: Url,
}

/// Immutable backend configuration consumed by [`crate::http::HttpLinkBackend`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
	/// Endpoint definitions.
	pub endpoints: BackendEndpoints,
	/// Profile forwarded with every link-token request.
	pub profile: LinkProfile,
	/// Validity assumed for link tokens whose response omits an expiration.
	pub link_token_ttl: Duration,
}
impl BackendDescriptor {
	/// Aggregators commonly keep link tokens valid for four hours.
	pub const DEFAULT_LINK_TOKEN_TTL: Duration = Duration::hours(4);

	/// Creates a new builder.
	pub fn builder() -> BackendDescriptorBuilder {
		BackendDescriptorBuilder::default()
	}
}
