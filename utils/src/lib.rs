//! Shared utilities for the Souk marketplace.

pub mod logging;

pub use logging::{init_tracing, LogFormat, LoggingError};
