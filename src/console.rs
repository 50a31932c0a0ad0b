use crate::builtin;
use crate::command::{CommandHandler, CommandInfo, Context, FnCommand};
use crate::config::ConsoleConfig;
use crate::error::ConsoleError;
use crate::history::{CommandHistory, OutputHistory, OutputKind};
use crate::registry::CommandRegistry;
use crate::script::{DisabledFallback, FallbackExecutor, ScriptEngine};
use crate::session::{Session, Variables};
use crate::value::Value;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

/// Invoked with the value of every evaluation that succeeds.
pub type EvaluationEndHandler<'a> = &'a mut dyn FnMut(&Value);

/// An embeddable developer console.
///
/// A console owns its [`Session`] (histories, variables, enabled namespaces),
/// the registry of custom commands and the fallback used for lines no command
/// matches. The built-in commands `help`, `namespace`, `vars`, `history` and
/// `exit` are registered on construction.
///
/// Example
/// ```
/// use dev_console::{Console, ConsoleConfig};
///
/// let mut console = Console::new(ConsoleConfig::default());
/// console.evaluate("$hp = 90", None);
/// console.evaluate("$hp + 10", None);
/// assert_eq!(console.commands().len(), 2);
/// assert_eq!(console.output().recall(0).unwrap().text, "100");
/// ```
pub struct Console {
    config: ConsoleConfig,
    session: Session,
    registry: CommandRegistry,
    fallback: Box<dyn FallbackExecutor>,
}

impl Console {
    /// Console using the snippet engine as fallback, or no fallback at all when
    /// `config.fallback` is false.
    pub fn new(config: ConsoleConfig) -> Self {
        let fallback: Box<dyn FallbackExecutor> = if config.fallback {
            Box::new(ScriptEngine::default())
        } else {
            Box::new(DisabledFallback)
        };
        Self::with_fallback(config, fallback)
    }

    /// Console with a custom fallback executor.
    pub fn with_fallback(config: ConsoleConfig, fallback: Box<dyn FallbackExecutor>) -> Self {
        let mut registry = CommandRegistry::new();
        if let Err(err) = builtin::register_all(&mut registry) {
            tracing::error!(error = %err, "failed to register built-in commands");
        }
        let mut console = Self {
            session: Session::new(&config),
            config,
            registry,
            fallback,
        };
        console.apply_namespaces();
        console
    }

    /// Take the namespaces the fallback knows about and drop configured ones it doesn't.
    fn apply_namespaces(&mut self) {
        let available = self.fallback.namespaces();
        if !available.is_empty() {
            self.session.namespaces.retain(|ns| {
                let known = available.contains(ns);
                if !known {
                    tracing::warn!(namespace = %ns, "ignoring unknown snippet namespace");
                }
                known
            });
        }
        self.session.available_namespaces = available;
    }

    /// Register a custom command. Fails if `name` is already taken; the
    /// existing command is left untouched.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Result<(), ConsoleError> {
        self.registry.register(name, Box::new(handler))
    }

    /// Register a closure as a custom command.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        func: F,
    ) -> Result<(), ConsoleError>
    where
        F: Fn(&CommandInfo, &mut Context<'_>) -> anyhow::Result<Value> + 'static,
    {
        self.register(name, FnCommand::new(description, func))
    }

    /// Evaluate one line of input.
    ///
    /// The trimmed line is always echoed to the output history. A matching
    /// custom command handles it; otherwise the fallback compiles and runs it.
    /// On success a non-null value is appended as a result, the command is
    /// recorded in the command history and `callback` is invoked with the
    /// value. On failure a single error line is appended instead and `callback`
    /// is not invoked. Nothing escapes this method, panics included.
    pub fn evaluate(&mut self, command: &str, callback: Option<EvaluationEndHandler<'_>>) {
        let command = command.trim();
        tracing::debug!(command, "evaluating");
        self.session.output.push_echo(command);

        let info = CommandInfo::parse(command);
        match self.dispatch(&info) {
            Ok(value) => {
                if !value.is_null() {
                    self.session.output.push_result(value.to_string());
                }
                self.session.commands.push(info);
                if let Some(callback) = callback {
                    callback(&value);
                }
            }
            Err(err) => {
                tracing::warn!(command = %info.name, error = %err, "evaluation failed");
                self.session
                    .output
                    .push_result(format!("An error occurred while evaluating: {}", err));
            }
        }
    }

    fn dispatch(&mut self, info: &CommandInfo) -> Result<Value, ConsoleError> {
        let registry = &self.registry;
        let session = &mut self.session;

        let handled = catch_panic(|| registry.try_handle(info, session)).map_err(|message| {
            ConsoleError::Dispatch {
                command: info.name.clone(),
                message,
            }
        })??;
        if let Some(value) = handled {
            return Ok(value);
        }

        tracing::debug!(command = %info.name, "no command matched, using fallback");
        let fallback = &self.fallback;
        catch_panic(|| {
            let executable = fallback.compile(&info.raw, session)?;
            executable.run(session)
        })
        .map_err(ConsoleError::Execute)?
    }

    pub fn output(&self) -> &OutputHistory {
        &self.session.output
    }

    pub fn commands(&self) -> &CommandHistory {
        &self.session.commands
    }

    pub fn variables(&self) -> &Variables {
        &self.session.variables
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// True once the `exit` command ran.
    pub fn should_exit(&self) -> bool {
        self.session.should_exit
    }

    pub fn clear_output(&mut self) {
        self.session.output.clear();
    }

    pub fn clear_commands(&mut self) {
        self.session.commands.clear();
    }

    /// Start over with a fresh session. Registered commands are kept.
    pub fn reset(&mut self) {
        tracing::debug!("resetting console session");
        self.session = Session::new(&self.config);
        self.apply_namespaces();
    }

    /// Read-Eval-Print Loop on the terminal.
    ///
    /// Prints the results of every evaluation and stops on Ctrl-C, Ctrl-D or
    /// after the `exit` command. Panics raised by commands or snippets are
    /// reported as results and only logged at debug level, not printed.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.session.should_exit {
            match rl.readline("> ") {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str())?;
                    for text in self.evaluate_collect(&line) {
                        println!("{}", text);
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Evaluate `command` and return the result lines it appended.
    pub fn evaluate_collect(&mut self, command: &str) -> Vec<String> {
        let mark = self.session.output.appended();
        self.evaluate(command, None);
        self.session
            .output
            .since(mark)
            .filter(|entry| entry.kind == OutputKind::Result)
            .map(|entry| entry.text.clone())
            .collect()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(ConsoleConfig::default())
    }
}

thread_local! {
    static CONTAINING_PANIC: Cell<bool> = const { Cell::new(false) };
}

/// Wrap the process panic hook once so panics caught by [`catch_panic`] go to
/// the debug log instead of stderr. Other panics reach the previous hook.
fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CONTAINING_PANIC.with(Cell::get) {
                tracing::debug!(%info, "contained panic");
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `f`, turning a panic into its message.
fn catch_panic<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    install_panic_hook();
    let outer = CONTAINING_PANIC.with(|flag| flag.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CONTAINING_PANIC.with(|flag| flag.set(outer));
    result.map_err(|payload| format!("panicked: {}", panic_payload_to_string(payload.as_ref())))
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::OutputEntry;

    fn texts(console: &Console) -> Vec<String> {
        console.output().iter().map(OutputEntry::to_string).collect()
    }

    #[test]
    fn test_echo_then_result() {
        let mut console = Console::default();
        console.evaluate("  2 * 21 ", None);
        assert_eq!(texts(&console), vec!["> 2 * 21", ": 42"]);
    }

    #[test]
    fn test_null_result_adds_no_line() {
        let mut console = Console::default();
        console.evaluate("$x = null", None);
        assert_eq!(texts(&console), vec!["> $x = null"]);
        assert_eq!(console.commands().len(), 1);
    }

    #[test]
    fn test_failure_message_format() {
        let mut console = Console::default();
        console.evaluate("$nope", None);
        assert_eq!(
            console.output().recall(0).unwrap().text,
            "An error occurred while evaluating: runtime error: variable `$nope` is undefined"
        );
        assert!(console.commands().is_empty());
    }

    #[test]
    fn test_catch_panic_keeps_message() {
        assert_eq!(catch_panic(|| 3), Ok(3));
        let err = catch_panic(|| -> i32 { panic!("kaboom") }).unwrap_err();
        assert_eq!(err, "panicked: kaboom");
    }

    #[test]
    fn test_catch_panic_only_quiets_while_containing() {
        assert!(!CONTAINING_PANIC.with(Cell::get));
        let inner = catch_panic(|| {
            assert!(CONTAINING_PANIC.with(Cell::get));
            catch_panic(|| -> i32 { panic!("nested") })
        });
        assert_eq!(inner, Ok(Err("panicked: nested".to_string())));
        assert!(!CONTAINING_PANIC.with(Cell::get));

        let _ = catch_panic(|| -> i32 { panic!("again") });
        assert!(!CONTAINING_PANIC.with(Cell::get));
    }

    #[test]
    fn test_unknown_configured_namespace_is_dropped() {
        let console = Console::new(ConsoleConfig::default().namespaces(["math", "physics"]));
        assert_eq!(console.session().namespaces, vec!["math"]);
        assert_eq!(console.session().available_namespaces, vec!["core", "math", "text"]);
    }

    #[test]
    fn test_namespace_changes_affect_compilation() {
        let mut console = Console::default();
        console.evaluate("namespace --remove math", None);
        console.evaluate("sqrt(16)", None);
        assert!(
            console
                .output()
                .recall(0)
                .unwrap()
                .text
                .contains("needs namespace `math`")
        );

        console.evaluate("namespace -a math", None);
        console.evaluate("sqrt(16)", None);
        assert_eq!(console.output().recall(0).unwrap().text, "4");
    }

    #[test]
    fn test_reset_restores_configured_state() {
        let mut console = Console::default();
        console.evaluate("$a = 1", None);
        console.evaluate("namespace -r text", None);
        console.evaluate("exit", None);
        assert!(console.should_exit());

        console.reset();
        assert!(console.output().is_empty());
        assert!(console.commands().is_empty());
        assert!(console.variables().is_empty());
        assert!(!console.should_exit());
        assert!(console.session().is_namespace_enabled("text"));
        assert!(console.registry().contains("help"));
    }

    #[test]
    fn test_evaluate_collect_returns_new_results_only() {
        let mut console = Console::default();
        console.evaluate("1", None);
        assert_eq!(console.evaluate_collect("log('a'); 2"), vec!["a", "2"]);
        assert!(console.evaluate_collect("$z = null").is_empty());
    }
}
