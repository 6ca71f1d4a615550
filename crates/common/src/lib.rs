//! Common utilities and types shared across speedtest exporter components.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
