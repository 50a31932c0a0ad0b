//! Error types for the console.

use thiserror::Error;

/// Everything that can go wrong while registering or evaluating a command.
///
/// Failures raised inside an evaluation never reach the caller of
/// [`Console::evaluate`](crate::Console::evaluate); they are rendered into the
/// output history instead. Only the registration variants are returned to
/// callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsoleError {
    /// The raw line could not be turned into a command. The command parser is
    /// total, so this is kept for collaborators that plug in stricter parsing.
    #[error("parse error: {0}")]
    Parse(String),

    /// A registered command matched but its handler failed.
    #[error("command `{command}` failed: {message}")]
    Dispatch { command: String, message: String },

    /// The fallback could not compile the line.
    #[error("compile error: {0}")]
    Compile(String),

    /// The fallback compiled the line but running it failed.
    #[error("runtime error: {0}")]
    Execute(String),

    /// A command with this name is already registered.
    #[error("command `{0}` is already registered")]
    RegistrationConflict(String),

    /// The name can never match a parsed command (empty or contains whitespace).
    #[error("invalid command name `{0}`")]
    InvalidCommandName(String),
}
