//! Shared error taxonomy for the SNAP core crate.

pub mod error;

pub use error::{Result, SnapError};
