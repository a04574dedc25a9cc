//! Error plumbing shared by the maiar crates.

pub mod error;

pub use error::FromMessage;
