use crate::command::{CommandHandler, CommandInfo, Context};
use crate::error::ConsoleError;
use crate::registry::CommandRegistry;
use crate::value::Value;
use anyhow::{Context as _, Result, bail};
use argh::{EarlyExit, FromArgs};
use std::marker::PhantomData;

/// Commands every console knows at construction time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) from the
/// arguments of the [`CommandInfo`] and executed directly against the session.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "help" or "vars".
    fn name() -> &'static str;

    /// One-line description listed by `help`.
    fn description() -> &'static str;

    /// Executes the command. The returned value becomes the console result.
    fn execute(self, ctx: &mut Context<'_>) -> Result<Value>;
}

/// Adapts a [`BuiltinCommand`] to the registry's [`CommandHandler`].
pub(crate) struct Builtin<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Builtin<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> CommandHandler for Builtin<T> {
    fn description(&self) -> &str {
        T::description()
    }

    fn handle(&self, info: &CommandInfo, ctx: &mut Context<'_>) -> Result<Value> {
        match T::from_args(&[T::name()], &info.args()) {
            Ok(cmd) => cmd.execute(ctx),
            // `--help` ends up here too, with an Ok status
            Err(EarlyExit { output, status }) => match status {
                Ok(()) => Ok(Value::Text(output.trim_end().to_string())),
                Err(()) => bail!("{}", output.trim_end()),
            },
        }
    }
}

fn register<T: BuiltinCommand + 'static>(registry: &mut CommandRegistry) -> Result<(), ConsoleError> {
    registry.register(T::name(), Box::new(Builtin::<T>::default()))
}

/// Registers `help`, `namespace`, `vars`, `history` and `exit`.
pub(crate) fn register_all(registry: &mut CommandRegistry) -> Result<(), ConsoleError> {
    register::<Help>(registry)?;
    register::<Namespace>(registry)?;
    register::<Vars>(registry)?;
    register::<History>(registry)?;
    register::<Exit>(registry)?;
    Ok(())
}

#[derive(FromArgs)]
/// List the available commands.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn description() -> &'static str {
        "Lists the available commands."
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<Value> {
        let mut lines = vec![
            "Type a command name followed by its arguments, or a snippet such as".to_string(),
            "`$x = 2 * 3; log($x)`. Run `<command> --help` for a command's options.".to_string(),
            String::new(),
            "Commands:".to_string(),
        ];
        for (name, description) in ctx.registry.iter() {
            lines.push(format!("{} - {}", name, description));
        }
        Ok(Value::Text(lines.join("\n")))
    }
}

#[derive(FromArgs)]
/// Manage the namespaces snippets may call functions from.
pub struct Namespace {
    #[argh(switch, short = 'l')]
    /// list enabled and disabled namespaces
    pub list: bool,

    #[argh(switch, short = 'a')]
    /// enable the given namespaces
    pub add: bool,

    #[argh(switch, short = 'r')]
    /// disable the given namespaces
    pub remove: bool,

    #[argh(positional)]
    /// namespace names for --add and --remove
    pub names: Vec<String>,
}

impl Namespace {
    fn list(ctx: &Context<'_>) -> String {
        let session = &*ctx.session;
        let mut lines = vec!["Namespaces:".to_string()];
        for ns in &session.available_namespaces {
            if session.is_namespace_enabled(ns) {
                lines.push(ns.clone());
            } else {
                lines.push(format!("{} (disabled)", ns));
            }
        }
        lines.join("\n")
    }

    fn add(names: &[String], ctx: &mut Context<'_>) -> String {
        let session = &mut *ctx.session;
        let mut lines = Vec::with_capacity(names.len());
        for name in names {
            if session.is_namespace_enabled(name) {
                lines.push(format!("Namespace {} already enabled.", name));
            } else if !session.available_namespaces.contains(name) {
                lines.push(format!("Namespace {} is not valid.", name));
            } else {
                tracing::info!(namespace = %name, "enabled snippet namespace");
                session.namespaces.push(name.clone());
                lines.push(format!("Enabled namespace {}.", name));
            }
        }
        lines.join("\n")
    }

    fn remove(names: &[String], ctx: &mut Context<'_>) -> String {
        let session = &mut *ctx.session;
        let before = session.namespaces.len();
        session.namespaces.retain(|ns| !names.contains(ns));
        let removed = before - session.namespaces.len();
        if removed > 0 {
            tracing::info!(removed, "disabled snippet namespaces");
        }
        format!("Removed {} namespaces.", removed)
    }
}

impl BuiltinCommand for Namespace {
    fn name() -> &'static str {
        "namespace"
    }

    fn description() -> &'static str {
        "Manages the namespaces used during snippet compilation."
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<Value> {
        let text = match (self.list, self.add, self.remove) {
            (false, false, false) => format!("Enter \"{} --help\" for help.", Self::name()),
            (true, false, false) => Self::list(ctx),
            (false, true, false) => {
                if self.names.is_empty() {
                    bail!("namespace: --add needs at least one namespace name");
                }
                Self::add(&self.names, ctx)
            }
            (false, false, true) => Self::remove(&self.names, ctx),
            _ => bail!("namespace: choose only one of --list, --add or --remove"),
        };
        Ok(Value::Text(text))
    }
}

#[derive(FromArgs)]
/// List the session variables.
pub struct Vars {
    #[argh(switch)]
    /// remove every variable
    pub clear: bool,
}

impl BuiltinCommand for Vars {
    fn name() -> &'static str {
        "vars"
    }

    fn description() -> &'static str {
        "Lists or clears the session variables."
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<Value> {
        let variables = &mut ctx.session.variables;
        if self.clear {
            let count = variables.len();
            variables.clear();
            return Ok(Value::Text(format!("Cleared {} variables.", count)));
        }
        if variables.is_empty() {
            return Ok(Value::from("No variables defined."));
        }
        let lines: Vec<_> = variables
            .iter()
            .map(|(name, value)| format!("{} = {} ({})", name, value, value.type_name()))
            .collect();
        Ok(Value::Text(lines.join("\n")))
    }
}

#[derive(FromArgs)]
/// Show the commands that evaluated successfully, oldest first.
pub struct History {
    #[argh(option, short = 'n')]
    /// only show the most recent N commands
    pub last: Option<usize>,

    #[argh(switch)]
    /// print the command records as JSON
    pub json: bool,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn description() -> &'static str {
        "Shows the command history."
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<Value> {
        let commands = &ctx.session.commands;
        let skip = match self.last {
            Some(n) => commands.len().saturating_sub(n),
            None => 0,
        };
        let records: Vec<_> = commands.iter().enumerate().skip(skip).collect();

        if self.json {
            let infos: Vec<_> = records.iter().map(|(_, info)| *info).collect();
            let json = serde_json::to_string_pretty(&infos)
                .context("history: can't serialize command history")?;
            return Ok(Value::Text(json));
        }
        if records.is_empty() {
            return Ok(Value::from("No commands in history."));
        }
        let lines: Vec<_> = records
            .iter()
            .map(|(i, info)| format!("{:>4}  {}", i + 1, info.raw))
            .collect();
        Ok(Value::Text(lines.join("\n")))
    }
}

#[derive(FromArgs)]
/// Ask the hosting front-end to stop.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn description() -> &'static str {
        "Leaves the console."
    }

    fn execute(self, ctx: &mut Context<'_>) -> Result<Value> {
        ctx.session.should_exit = true;
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        register_all(&mut registry).unwrap();
        registry
    }

    fn run(registry: &CommandRegistry, session: &mut Session, line: &str) -> Result<Value, ConsoleError> {
        registry
            .try_handle(&CommandInfo::parse(line), session)
            .map(|handled| handled.expect("builtin should match"))
    }

    fn text(value: Value) -> String {
        match value {
            Value::Text(s) => s,
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_all_builtins_registered_in_order() {
        let names: Vec<_> = registry().iter().map(|(name, _)| name.to_string()).collect();
        assert_eq!(names, vec!["help", "namespace", "vars", "history", "exit"]);
    }

    #[test]
    fn test_help_lists_commands_with_descriptions() {
        let registry = registry();
        let out = text(run(&registry, &mut Session::default(), "help").unwrap());
        assert!(out.contains("help - Lists the available commands."));
        assert!(out.contains("exit - Leaves the console."));
    }

    #[test]
    fn test_help_flag_prints_usage() {
        let registry = registry();
        let out = text(run(&registry, &mut Session::default(), "namespace --help").unwrap());
        assert!(out.starts_with("Usage: namespace"));
        assert!(out.contains("--add"));
    }

    #[test]
    fn test_unknown_flag_is_a_failure() {
        let registry = registry();
        let err = run(&registry, &mut Session::default(), "vars --bogus").unwrap_err();
        assert!(matches!(err, ConsoleError::Dispatch { ref command, .. } if command == "vars"));
    }

    #[test]
    fn test_namespace_without_action_hints_help() {
        let registry = registry();
        let out = text(run(&registry, &mut Session::default(), "namespace").unwrap());
        assert_eq!(out, "Enter \"namespace --help\" for help.");
    }

    #[test]
    fn test_namespace_add_and_remove() {
        let registry = registry();
        let mut session = Session::default();
        session.namespaces = vec!["core".to_string()];

        let out = text(run(&registry, &mut session, "namespace -a math core nope").unwrap());
        assert_eq!(
            out,
            "Enabled namespace math.\nNamespace core already enabled.\nNamespace nope is not valid."
        );
        assert_eq!(session.namespaces, vec!["core", "math"]);

        let out = text(run(&registry, &mut session, "namespace --remove math text").unwrap());
        assert_eq!(out, "Removed 1 namespaces.");
        assert_eq!(session.namespaces, vec!["core"]);
    }

    #[test]
    fn test_namespace_list_marks_disabled() {
        let registry = registry();
        let mut session = Session::default();
        session.namespaces = vec!["text".to_string()];
        let out = text(run(&registry, &mut session, "namespace -l").unwrap());
        assert_eq!(out, "Namespaces:\ncore (disabled)\nmath (disabled)\ntext");
    }

    #[test]
    fn test_namespace_conflicting_actions() {
        let registry = registry();
        assert!(run(&registry, &mut Session::default(), "namespace -l -r core").is_err());
        assert!(run(&registry, &mut Session::default(), "namespace --add").is_err());
    }

    #[test]
    fn test_vars_lists_and_clears() {
        let registry = registry();
        let mut session = Session::default();
        assert_eq!(
            run(&registry, &mut session, "vars").unwrap(),
            Value::from("No variables defined.")
        );

        session.variables.assign("$b", Value::from("x"));
        session.variables.assign("$a", Value::from(1.5));
        let out = text(run(&registry, &mut session, "vars").unwrap());
        assert_eq!(out, "$a = 1.5 (number)\n$b = x (text)");

        let out = text(run(&registry, &mut session, "vars --clear").unwrap());
        assert_eq!(out, "Cleared 2 variables.");
        assert!(session.variables.is_empty());
    }

    #[test]
    fn test_history_numbering_and_last() {
        let registry = registry();
        let mut session = Session::default();
        for line in ["help", "vars", "1 + 1"] {
            session.commands.push(CommandInfo::parse(line));
        }
        let out = text(run(&registry, &mut session, "history").unwrap());
        assert_eq!(out, "   1  help\n   2  vars\n   3  1 + 1");

        let out = text(run(&registry, &mut session, "history --last 1").unwrap());
        assert_eq!(out, "   3  1 + 1");
    }

    #[test]
    fn test_history_json() {
        let registry = registry();
        let mut session = Session::default();
        session.commands.push(CommandInfo::parse("$x = 2"));

        let out = text(run(&registry, &mut session, "history --json").unwrap());
        let parsed: Vec<CommandInfo> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, vec![CommandInfo::parse("$x = 2")]);
    }

    #[test]
    fn test_exit_sets_flag() {
        let registry = registry();
        let mut session = Session::default();
        assert_eq!(run(&registry, &mut session, "exit").unwrap(), Value::Null);
        assert!(session.should_exit);
    }
}
