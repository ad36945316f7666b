//! Maps session state onto the affordance a host should render.
//!
//! Rendering itself belongs to the host; this module only decides *what* to show:
//! a loading indicator, an error banner, or the link control in one of three variants.

// self
use crate::{
	_prelude::*,
	auth::UserId,
	session::{Activation, Initiation, LinkSession, SessionState},
};

/// Visual variant of the link control, chosen by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
	/// Prominent call to action.
	Primary,
	/// Low-emphasis control with an icon, for navigation rails.
	Ghost,
	/// Compact "add" control.
	#[default]
	Default,
}

/// Icon reference attached to a control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Icon {
	/// Asset path.
	pub src: &'static str,
	/// Alternative text.
	pub alt: &'static str,
	/// Square edge length in pixels.
	pub size: u16,
}

/// Link control description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlSpec {
	/// Variant the control was built for.
	pub variant: Variant,
	/// Text label.
	pub label: &'static str,
	/// Optional leading icon.
	pub icon: Option<Icon>,
	/// Whether pressing the control can open the widget.
	pub enabled: bool,
}
impl ControlSpec {
	fn for_variant(variant: Variant, enabled: bool) -> Self {
		let (label, icon) = match variant {
			Variant::Primary => ("Connect bank", None),
			Variant::Ghost => (
				"Connect bank",
				Some(Icon { src: "/icons/connect-bank.svg", alt: "connect bank", size: 24 }),
			),
			Variant::Default =>
				("Add bank", Some(Icon { src: "/icons/plus.svg", alt: "plus", size: 20 })),
		};

		Self { variant, label, icon, enabled }
	}
}

/// What the host should render for a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Affordance {
	/// Link token not available yet.
	Loading,
	/// The last attempt failed.
	ErrorBanner {
		/// Message to display.
		message: String,
	},
	/// The link control.
	Control(ControlSpec),
}
impl Affordance {
	/// Maps `state` to an affordance in the given variant.
	pub fn for_state(state: &SessionState, variant: Variant) -> Self {
		match state {
			SessionState::Idle | SessionState::FetchingToken { .. } => Affordance::Loading,
			SessionState::Failed { failure, .. } =>
				Affordance::ErrorBanner { message: failure.message.clone() },
			state =>
				Affordance::Control(ControlSpec::for_variant(variant, state.is_interactable())),
		}
	}
}

/// Binds a [`LinkSession`] to a control variant for one mounted component.
#[derive(Clone, Debug)]
pub struct PresentationAdapter {
	session: LinkSession,
	variant: Variant,
}
impl PresentationAdapter {
	/// Wraps a session.
	pub fn new(session: LinkSession, variant: Variant) -> Self {
		Self { session, variant }
	}

	/// Starts the session for `user`, as a component does when it mounts.
	pub async fn mount(&self, user: &UserId) -> Initiation {
		self.session.initiate(user).await
	}

	/// Affordance for the current state.
	pub fn render(&self) -> Affordance {
		Affordance::for_state(&self.session.state(), self.variant)
	}

	/// Handles a press on the control. Presses outside `Ready` are rejected by the session.
	pub async fn press(&self) -> Activation {
		self.session.activate().await
	}

	/// Releases the session, as a component does when it unmounts.
	pub fn unmount(&self) {
		self.session.teardown();
	}

	/// Underlying session.
	pub fn session(&self) -> &LinkSession {
		&self.session
	}

	/// Configured variant.
	pub fn variant(&self) -> Variant {
		self.variant
	}
}
