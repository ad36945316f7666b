//! Walks one user through the full link lifecycle against the in-process backend: mount,
//! a dismissed widget, a completed link, and unmount.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use bank_link::{
	auth::UserId,
	backend::MemoryBackend,
	presentation::{PresentationAdapter, Variant},
	session::{Activation, Initiation, LinkSession},
	widget::{ScriptedWidget, WidgetOutcome},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let backend = MemoryBackend::default();
	let widget = Arc::new(ScriptedWidget::default());
	let session = LinkSession::with_backend(backend.clone(), widget.clone());
	let adapter = PresentationAdapter::new(session, Variant::Primary);
	let user = UserId::new("demo-user")?;

	println!("Before mount: {:?}", adapter.render());

	match adapter.mount(&user).await {
		Initiation::Ready => println!("Mounted: {:?}", adapter.render()),
		other => return Err(eyre!("Link token fetch did not succeed: {other:?}.")),
	}

	widget.dismiss();

	println!("User closed the widget: {:?}", adapter.press().await);

	let link_token = adapter
		.session()
		.state()
		.link_token()
		.cloned()
		.ok_or_else(|| eyre!("Session should still hold its link token."))?;

	widget.push(WidgetOutcome::Success(backend.complete_link(&link_token)?));

	match adapter.press().await {
		Activation::Linked(receipt) => println!("Linked item {:?}.", receipt.item_id),
		other => return Err(eyre!("Link did not complete: {other:?}.")),
	}

	println!("Stored credentials: {:?}", backend.credentials_for(&user));
	println!("After link: {:?}", adapter.render());

	adapter.unmount();

	println!("After unmount: {:?}", adapter.session());

	Ok(())
}
