// self
use crate::{
	_prelude::*,
	backend::{BackendDescriptor, BackendEndpoints, LinkProfile},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum BackendDescriptorError {
	/// Link-token endpoint is mandatory.
	#[error("Missing link token endpoint.")]
	MissingLinkTokenEndpoint,
	/// Exchange endpoint is mandatory.
	#[error("Missing exchange endpoint.")]
	MissingExchangeEndpoint,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Fallback link-token validity must be positive.
	#[error("The link token TTL must be positive.")]
	NonPositiveLinkTokenTtl,
	/// A required profile field was left empty.
	#[error("The link profile field `{field}` must not be empty.")]
	EmptyProfileField {
		/// Offending field name.
		field: &'static str,
	},
	/// Country codes must be ISO 3166-1 alpha-2.
	#[error("Country code `{code}` is not an ISO 3166-1 alpha-2 code.")]
	InvalidCountryCode {
		/// Offending code.
		code: String,
	},
}

/// Builder for [`BackendDescriptor`] values.
#[derive(Debug)]
pub struct BackendDescriptorBuilder {
	/// Endpoint that creates link tokens.
	pub link_token_endpoint: Option<Url>,
	/// Endpoint that exchanges public tokens.
	pub exchange_endpoint: Option<Url>,
	/// Profile forwarded with link-token requests.
	pub profile: LinkProfile,
	/// Fallback link-token validity.
	pub link_token_ttl: Duration,
}
impl BackendDescriptorBuilder {
	/// Sets the link-token endpoint.
	pub fn link_token_endpoint(mut self, url: Url) -> Self {
		self.link_token_endpoint = Some(url);

		self
	}

	/// Sets the exchange endpoint.
	pub fn exchange_endpoint(mut self, url: Url) -> Self {
		self.exchange_endpoint = Some(url);

		self
	}

	/// Resolves both endpoints against a shared base URL using the conventional paths
	/// `link/token/create` and `item/public_token/exchange`.
	pub fn base_url(self, base: &Url) -> Result<Self, url::ParseError> {
		let link_token = base.join("link/token/create")?;
		let exchange = base.join("item/public_token/exchange")?;

		Ok(self.link_token_endpoint(link_token).exchange_endpoint(exchange))
	}

	/// Overrides the link profile.
	pub fn profile(mut self, profile: LinkProfile) -> Self {
		self.profile = profile;

		self
	}

	/// Overrides the fallback link-token validity.
	pub fn link_token_ttl(mut self, ttl: Duration) -> Self {
		self.link_token_ttl = ttl;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<BackendDescriptor, BackendDescriptorError> {
		let link_token =
			self.link_token_endpoint.ok_or(BackendDescriptorError::MissingLinkTokenEndpoint)?;
		let exchange =
			self.exchange_endpoint.ok_or(BackendDescriptorError::MissingExchangeEndpoint)?;
		let descriptor = BackendDescriptor {
			endpoints: BackendEndpoints { link_token, exchange },
			profile: self.profile,
			link_token_ttl: self.link_token_ttl,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}
impl Default for BackendDescriptorBuilder {
	fn default() -> Self {
		Self {
			link_token_endpoint: None,
			exchange_endpoint: None,
			profile: LinkProfile::default(),
			link_token_ttl: BackendDescriptor::DEFAULT_LINK_TOKEN_TTL,
		}
	}
}

impl BackendDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), BackendDescriptorError> {
		validate_endpoint("link_token", &self.endpoints.link_token)?;
		validate_endpoint("exchange", &self.endpoints.exchange)?;

		if !self.link_token_ttl.is_positive() {
			return Err(BackendDescriptorError::NonPositiveLinkTokenTtl);
		}

		validate_profile(&self.profile)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), BackendDescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(BackendDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}

fn validate_profile(profile: &LinkProfile) -> Result<(), BackendDescriptorError> {
	if profile.client_name.trim().is_empty() {
		return Err(BackendDescriptorError::EmptyProfileField { field: "client_name" });
	}
	if profile.language.trim().is_empty() {
		return Err(BackendDescriptorError::EmptyProfileField { field: "language" });
	}
	if profile.products.iter().all(|product| product.trim().is_empty()) {
		return Err(BackendDescriptorError::EmptyProfileField { field: "products" });
	}
	if profile.country_codes.is_empty() {
		return Err(BackendDescriptorError::EmptyProfileField { field: "country_codes" });
	}
	if let Some(code) = profile
		.country_codes
		.iter()
		.find(|code| code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()))
	{
		return Err(BackendDescriptorError::InvalidCountryCode { code: code.clone() });
	}

	Ok(())
}
