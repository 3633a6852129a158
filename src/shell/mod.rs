// Terminal display of the page state
pub mod display;

// Interactive loop
mod shell;

// Per-command handlers
mod commands;

pub use shell::shell_loop;
pub(crate) use commands::{parse_kind, with_spinner};
