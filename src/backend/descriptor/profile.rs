// self
use crate::_prelude::*;

/// Settings the backend forwards to the aggregator when it creates a link token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkProfile {
	/// Application name shown inside the aggregator widget.
	pub client_name: String,
	/// Aggregator products requested for the linked item.
	pub products: Vec<String>,
	/// ISO 3166-1 alpha-2 country codes whose institutions are offered.
	pub country_codes: Vec<String>,
	/// Widget display language.
	pub language: String,
}
impl LinkProfile {
	/// Overrides the client name.
	pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
		self.client_name = name.into();

		self
	}

	/// Replaces the requested products.
	pub fn with_products<I, S>(mut self, products: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.products = products.into_iter().map(Into::into).collect();

		self
	}

	/// Replaces the offered country codes.
	pub fn with_country_codes<I, S>(mut self, codes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.country_codes = codes.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the widget language.
	pub fn with_language(mut self, language: impl Into<String>) -> Self {
		self.language = language.into();

		self
	}
}
impl Default for LinkProfile {
	fn default() -> Self {
		Self {
			client_name: env!("CARGO_PKG_NAME").into(),
			products: vec!["auth".into()],
			country_codes: vec!["US".into()],
			language: "en".into(),
		}
	}
}
