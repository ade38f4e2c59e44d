//! Command shell over the virtual filesystem.
//!
//! Turns command lines into calls against [`Vfs`](crate::vfs::Vfs), in either
//! an interactive editor session or a script that stops at the first failure.

mod command;
mod prompt;
mod runner;
#[allow(clippy::module_inception)]
mod shell;
mod tokenizer;

pub use prompt::Prompt;
pub use runner::{ScriptError, run_interactive, run_script, script_lines};
pub use shell::{Shell, ShellError};
