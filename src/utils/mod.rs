//! The `utils` module holds the pieces shared by the server and the CLI:
//! the crate-level error type and tracing setup.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
