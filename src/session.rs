use crate::config::ConsoleConfig;
use crate::history::{CommandHistory, OutputHistory};
use crate::script::DEFAULT_NAMESPACES;
use crate::value::Value;
use std::collections::BTreeMap;

/// Mutable state of a running console, shared by commands and the fallback.
///
/// The session contains:
/// - `output`: every echoed line and result, for the hosting UI.
/// - `commands`: the commands that evaluated successfully.
/// - `variables`: the `$name` table snippets read and write.
/// - `namespaces`: snippet namespaces currently enabled.
/// - `available_namespaces`: every namespace the fallback knows about.
/// - `should_exit`: a flag a REPL loop can check to know when to terminate.
#[derive(Debug, Clone)]
pub struct Session {
    pub output: OutputHistory,
    pub commands: CommandHistory,
    pub variables: Variables,
    pub namespaces: Vec<String>,
    pub available_namespaces: Vec<String>,
    pub should_exit: bool,
}

impl Session {
    pub fn new(config: &ConsoleConfig) -> Self {
        Self {
            output: OutputHistory::with_capacity(config.max_output_lines),
            commands: CommandHistory::with_capacity(config.max_command_history),
            variables: Variables::default(),
            namespaces: config.namespaces.clone(),
            available_namespaces: DEFAULT_NAMESPACES.iter().map(|ns| ns.to_string()).collect(),
            should_exit: false,
        }
    }

    pub fn is_namespace_enabled(&self, namespace: &str) -> bool {
        self.namespaces.iter().any(|ns| ns == namespace)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&ConsoleConfig::default())
    }
}

/// Session variables, keyed by name including the leading `$`.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: BTreeMap<String, Value>,
}

impl Variables {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Set `name` to `value`. Assigning [`Value::Null`] removes the variable.
    pub fn assign(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if value.is_null() {
            self.values.remove(&name);
        } else {
            self.values.insert(name, value);
        }
    }

    /// Variables sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
