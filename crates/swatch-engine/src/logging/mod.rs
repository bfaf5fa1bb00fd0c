//! Logger setup.
//!
//! The crate itself only emits through the `log` facade. Hosts that have no
//! logger of their own can call [`init_logging`] once at startup.

mod init;

pub use init::{init_logging, LoggingConfig};
