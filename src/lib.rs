//! A small, embeddable developer console.
//!
//! The console accepts a free-form line of text, dispatches it to a registered
//! built-in command when the first word names one, and otherwise compiles and
//! runs the whole line as a snippet of a tiny expression language. Every line
//! and every result is kept in an ordered output history that a hosting UI can
//! render, and successfully evaluated commands are kept in a command history.
//!
//! The main entry point is [`Console`]. The public modules [`command`],
//! [`history`] and [`session`] expose the types needed to write your own
//! commands and to read back what the console produced.
//!
//! ```
//! use dev_console::{Console, ConsoleConfig, Value};
//!
//! let mut console = Console::new(ConsoleConfig::default());
//! console
//!     .register_fn("echo", "Prints its arguments.", |info, _ctx| {
//!         Ok(Value::from(info.arguments.join(" ")))
//!     })
//!     .unwrap();
//!
//! let mut seen = None;
//! console.evaluate("echo hello", Some(&mut |v: &Value| seen = Some(v.clone())));
//! assert_eq!(seen, Some(Value::from("hello")));
//!
//! console.evaluate("1 + 2 * 3", None);
//! let last = console.output().snapshot().pop().unwrap();
//! assert_eq!(last.text, "7");
//! ```

mod builtin;
pub mod command;
pub mod config;
mod console;
pub mod error;
pub mod history;
mod registry;
pub mod script;
pub mod session;
mod value;

pub use command::{CommandHandler, CommandInfo, Context};
pub use config::ConsoleConfig;
/// Just a convenient re-export of the console itself.
///
/// See [`Console`] for the high-level API.
pub use console::{Console, EvaluationEndHandler};
pub use error::ConsoleError;
pub use registry::CommandRegistry;
pub use value::Value;
