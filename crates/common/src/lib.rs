//! Shared types, error definitions, and filesystem locations used across all
//! positive-vibes crates.

pub mod error;
pub mod paths;
pub mod types;

pub use {
    error::{Error, ErrorKind, Result},
    types::{ResourceKind, TargetKind},
};
