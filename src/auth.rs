//! Identity references and the credential types that flow through a link session.

pub mod id;
pub mod token;

pub use id::*;
pub use token::{credential::*, link::*, public::*, secret::*};
