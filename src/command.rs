use crate::registry::CommandRegistry;
use crate::session::Session;
use crate::value::Value;
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Structured view of one line of console input.
///
/// Built exactly once per evaluation from the trimmed line. `name` is the
/// first whitespace-separated token and `arguments` are the rest, so `name` is
/// empty only when `raw` is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    /// The line as evaluated, after trimming.
    pub raw: String,
    /// First token of the line.
    pub name: String,
    /// Remaining tokens, in order.
    pub arguments: Vec<String>,
    /// `$variables` the line assigns to, in order of first appearance.
    pub assigned_variables: Vec<String>,
    /// `$variables` the line reads, in order of first appearance.
    pub referenced_variables: Vec<String>,
}

impl CommandInfo {
    /// Split `text` on whitespace. Never fails; empty input gives an empty name.
    pub fn parse(text: &str) -> Self {
        let mut tokens = text.split_whitespace().map(str::to_string);
        let name = tokens.next().unwrap_or_default();
        let arguments = tokens.collect();
        let (assigned_variables, referenced_variables) = scan_variables(text);
        Self {
            raw: text.to_string(),
            name,
            arguments,
            assigned_variables,
            referenced_variables,
        }
    }

    /// Arguments as string slices, the shape `argh` expects.
    pub fn args(&self) -> Vec<&str> {
        self.arguments.iter().map(String::as_str).collect()
    }
}

fn string_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""(?:\\.|[^"\\])*"?|'(?:\\.|[^'\\])*'?"#).expect("valid literal regex")
    })
}

fn variable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // same name rules as the snippet lexer: alphabetic or `_`, then ASCII digits too
        Regex::new(r"\$([\p{Alphabetic}_][\p{Alphabetic}0-9_]*)(?:\s*(==?))?")
            .expect("valid variable regex")
    })
}

/// Find assigned and referenced `$variables`, ignoring string literal contents.
fn scan_variables(text: &str) -> (Vec<String>, Vec<String>) {
    let code = string_literal_re().replace_all(text, |caps: &regex::Captures| {
        " ".repeat(caps[0].len())
    });

    let mut assigned = Vec::new();
    let mut referenced = Vec::new();
    for caps in variable_re().captures_iter(&code) {
        let name = format!("${}", &caps[1]);
        let target = if caps.get(2).is_some_and(|op| op.as_str() == "=") {
            &mut assigned
        } else {
            &mut referenced
        };
        if !target.contains(&name) {
            target.push(name);
        }
    }
    (assigned, referenced)
}

/// What a handler gets to work with while it runs.
pub struct Context<'a> {
    /// Histories, variables and enabled namespaces of the running console.
    pub session: &'a mut Session,
    /// The registry that dispatched the command, for listing commands.
    pub registry: &'a CommandRegistry,
}

/// A command that can be registered with the console under a name.
///
/// Handlers are only invoked for lines whose first token equals the name they
/// were registered under. Returning an error marks the evaluation as failed;
/// the console reports it in the output history.
pub trait CommandHandler {
    /// One-line description shown by `help`.
    fn description(&self) -> &str {
        ""
    }

    /// Run the command.
    fn handle(&self, info: &CommandInfo, ctx: &mut Context<'_>) -> Result<Value>;
}

/// Adapter turning a closure into a [`CommandHandler`].
pub struct FnCommand<F> {
    description: String,
    func: F,
}

impl<F> FnCommand<F>
where
    F: Fn(&CommandInfo, &mut Context<'_>) -> Result<Value>,
{
    pub fn new(description: impl Into<String>, func: F) -> Self {
        Self {
            description: description.into(),
            func,
        }
    }
}

impl<F> CommandHandler for FnCommand<F>
where
    F: Fn(&CommandInfo, &mut Context<'_>) -> Result<Value>,
{
    fn description(&self) -> &str {
        &self.description
    }

    fn handle(&self, info: &CommandInfo, ctx: &mut Context<'_>) -> Result<Value> {
        (self.func)(info, ctx)
    }
}
