//! The `logger` module installs the global `tracing` subscriber with a
//! reloadable filter: bootstrap level first, then the one from settings.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
