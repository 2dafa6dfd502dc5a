//! Command implementations for the CLI.

mod config;
mod render;
mod scan;
mod watch;

pub use config::cmd_config;
pub use render::{RenderArgs, cmd_render};
pub use scan::cmd_scan;
pub use watch::{WatchArgs, cmd_watch};
