use crate::command::{CommandHandler, CommandInfo, Context};
use crate::error::ConsoleError;
use crate::session::Session;
use crate::value::Value;
use std::collections::HashMap;

struct Entry {
    name: String,
    handler: Box<dyn CommandHandler>,
}

/// Name-to-handler dispatch table for custom commands.
///
/// Names match exactly and case-sensitively against [`CommandInfo::name`].
/// Registration order is kept for listing.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`.
    ///
    /// Fails if the name is taken, leaving the existing handler in place, or if
    /// the name could never match a parsed command.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Box<dyn CommandHandler>,
    ) -> Result<(), ConsoleError> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ConsoleError::InvalidCommandName(name));
        }
        if self.index.contains_key(&name) {
            return Err(ConsoleError::RegistrationConflict(name));
        }
        tracing::info!(command = %name, "registered console command");
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(Entry { name, handler });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, description)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.handler.description()))
    }

    /// Run the handler registered for `info.name`.
    ///
    /// Returns `Ok(None)` when no handler matches. A failing handler is
    /// reported as [`ConsoleError::Dispatch`].
    pub fn try_handle(
        &self,
        info: &CommandInfo,
        session: &mut Session,
    ) -> Result<Option<Value>, ConsoleError> {
        let Some(&slot) = self.index.get(&info.name) else {
            return Ok(None);
        };
        tracing::debug!(command = %info.name, "dispatching to custom command");
        let mut ctx = Context {
            session,
            registry: self,
        };
        self.entries[slot]
            .handler
            .handle(info, &mut ctx)
            .map(Some)
            .map_err(|e| ConsoleError::Dispatch {
                command: info.name.clone(),
                message: format!("{:#}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FnCommand;

    fn constant(v: &'static str) -> Box<dyn CommandHandler> {
        Box::new(FnCommand::new("constant", move |_, _| {
            Ok(Value::from(v))
        }))
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = CommandRegistry::new();
        registry.register("greet", constant("first")).unwrap();

        let err = registry.register("greet", constant("second")).unwrap_err();
        assert_eq!(err, ConsoleError::RegistrationConflict("greet".to_string()));

        let mut session = Session::default();
        let value = registry
            .try_handle(&CommandInfo::parse("greet"), &mut session)
            .unwrap();
        assert_eq!(value, Some(Value::from("first")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut registry = CommandRegistry::new();
        assert!(matches!(
            registry.register("", constant("x")),
            Err(ConsoleError::InvalidCommandName(_))
        ));
        assert!(matches!(
            registry.register("two words", constant("x")),
            Err(ConsoleError::InvalidCommandName(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_match_is_exact_and_case_sensitive() {
        let mut registry = CommandRegistry::new();
        registry.register("help", constant("ok")).unwrap();
        let mut session = Session::default();

        for miss in ["Help", "hel", "helpme", ""] {
            let handled = registry
                .try_handle(&CommandInfo::parse(miss), &mut session)
                .unwrap();
            assert_eq!(handled, None, "{miss:?} must not match");
        }
    }

    #[test]
    fn test_handler_failure_becomes_dispatch_error() {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                "boom",
                Box::new(FnCommand::new("", |_, _| {
                    Err(anyhow::anyhow!("exploded"))
                })),
            )
            .unwrap();

        let mut session = Session::default();
        let err = registry
            .try_handle(&CommandInfo::parse("boom now"), &mut session)
            .unwrap_err();
        assert_eq!(
            err,
            ConsoleError::Dispatch {
                command: "boom".to_string(),
                message: "exploded".to_string(),
            }
        );
    }

    #[test]
    fn test_iter_lists_in_registration_order() {
        let mut registry = CommandRegistry::new();
        registry.register("b", constant("1")).unwrap();
        registry.register("a", constant("2")).unwrap();
        let names: Vec<_> = registry.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
