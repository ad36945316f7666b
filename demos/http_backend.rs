//! Drives a link session over HTTP against a mocked application backend.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use bank_link::{
	auth::UserId,
	backend::{BackendDescriptor, LinkProfile},
	http::HttpLinkBackend,
	reqwest::{Client, redirect::Policy},
	session::{LinkSession, SessionConfig},
	url::Url,
	widget::ScriptedWidget,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/link/token/create");
			then.status(200).header("content-type", "application/json").body(
				"{\"linkToken\":\"link-sandbox-demo\",\"expiration\":\"2099-01-01T00:00:00Z\"}",
			);
		})
		.await;
	let exchange_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/item/public_token/exchange");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"itemId\":\"item-demo\"}");
		})
		.await;
	let descriptor = BackendDescriptor::builder()
		.base_url(&Url::parse(&server.url("/"))?)?
		.profile(LinkProfile::default().with_client_name("Demo Budget"))
		.build()?;
	// httpmock serves a self-signed certificate.
	let client = Client::builder()
		.redirect(Policy::none())
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()?;
	let backend = HttpLinkBackend::with_client(client, descriptor);
	let widget = Arc::new(ScriptedWidget::default());
	let session = LinkSession::with_backend(backend, widget.clone())
		.with_config(SessionConfig::default());
	let user = UserId::new("demo-user")?;

	println!("Initiate: {:?}", session.initiate(&user).await);

	widget.succeed_with("public-sandbox-demo");

	println!("Activate: {:?}", session.activate().await);
	println!("State: {:?}", session.state());

	token_mock.assert_async().await;
	exchange_mock.assert_async().await;

	Ok(())
}
