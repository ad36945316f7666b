//! Link, public, and access credentials plus the redacting secret wrapper they share.

pub mod credential;
pub mod link;
pub mod public;
pub mod secret;
