//! The `settings` module loads `Settings` from TOML plus environment overrides.
//! See `bin/session_demo.rs` for a binary that runs against the dev settings.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
