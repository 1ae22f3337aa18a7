//! Shared types for the DMPRoadmap API console workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
