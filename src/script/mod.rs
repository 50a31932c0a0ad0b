//! The fallback executor: compiles a line that matched no command as a
//! snippet of a small expression language and runs it.
//!
//! ```text
//! $speed = 4.5; $time = 2
//! log('distance: ' + $speed * $time)
//! round(sqrt(pow(3, 2) + pow(4, 2)))
//! ```
//!
//! Functions live in namespaces (`core`, `math`, `text`); only functions of
//! namespaces enabled in the [`Session`] resolve.

mod eval;
mod lexer;
mod library;
mod parser;

pub use eval::RuntimeError;
pub use lexer::{LexingError, Token, split_into_tokens};
pub use library::{CallContext, Function, Library, NativeFn, TypeFactories};
pub use parser::{BinaryOp, MAX_DEPTH, ParsingError, UnaryOp};

use crate::error::ConsoleError;
use crate::session::Session;
use crate::value::Value;
use eval::Evaluator;
use parser::{Expr, Stmt};
use std::sync::Arc;
use thiserror::Error;

/// Namespaces enabled when nothing else is configured.
pub const DEFAULT_NAMESPACES: &[&str] = &["core", "math", "text"];

/// Snippets longer than this many tokens are rejected before parsing.
pub const MAX_TOKENS: usize = 1024;

/// Object-safe trait for anything the fallback can run once compiled.
pub trait Executable {
    /// Runs the compiled snippet against the session.
    fn run(self: Box<Self>, session: &mut Session) -> Result<Value, ConsoleError>;
}

/// Compiles text into an [`Executable`].
///
/// This is what the console calls when no custom command matches a line.
pub trait FallbackExecutor {
    /// Compile `source`. Failures must be reported as [`ConsoleError::Compile`].
    fn compile(&self, source: &str, session: &Session) -> Result<Box<dyn Executable>, ConsoleError>;

    /// Namespaces this executor knows about, enabled or not.
    fn namespaces(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Errors found while turning a snippet into a program.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Lexing(#[from] LexingError),

    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error("snippet has more than {0} tokens")]
    TooLong(usize),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("function `{function}` needs namespace `{namespace}`; enable it with `namespace --add {namespace}`")]
    NamespaceDisabled { function: String, namespace: String },

    #[error("function `{function}` takes {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: String,
        got: usize,
    },
}

impl From<CompileError> for ConsoleError {
    fn from(err: CompileError) -> Self {
        ConsoleError::Compile(err.to_string())
    }
}

impl From<RuntimeError> for ConsoleError {
    fn from(err: RuntimeError) -> Self {
        ConsoleError::Execute(err.to_string())
    }
}

/// The default fallback: the snippet language described in the module docs.
#[derive(Clone)]
pub struct ScriptEngine {
    library: Arc<Library>,
}

impl ScriptEngine {
    pub fn new(library: Library) -> Self {
        Self {
            library: Arc::new(library),
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Lex, parse and resolve `source` against the namespaces enabled in `session`.
    pub fn compile_program(&self, source: &str, session: &Session) -> Result<Program, CompileError> {
        let tokens = lexer::split_into_tokens(source)?;
        if tokens.len() > MAX_TOKENS {
            return Err(CompileError::TooLong(MAX_TOKENS));
        }
        let statements = parser::construct_ast(tokens)?;
        for statement in &statements {
            let expr = match statement {
                Stmt::Assign { value, .. } => value,
                Stmt::Expr(expr) => expr,
            };
            self.resolve(expr, session)?;
        }
        Ok(Program {
            statements,
            library: Arc::clone(&self.library),
        })
    }

    /// Check that every call names a reachable function with a valid arity.
    fn resolve(&self, expr: &Expr, session: &Session) -> Result<(), CompileError> {
        match expr {
            Expr::Literal(_) | Expr::Variable(_) => Ok(()),
            Expr::Unary { operand, .. } => self.resolve(operand, session),
            Expr::Binary { lhs, rhs, .. } => {
                self.resolve(lhs, session)?;
                self.resolve(rhs, session)
            }
            Expr::Call { name, args } => {
                let function = self
                    .library
                    .function(name)
                    .ok_or_else(|| CompileError::UnknownFunction(name.clone()))?;
                if !session.is_namespace_enabled(function.namespace) {
                    return Err(CompileError::NamespaceDisabled {
                        function: name.clone(),
                        namespace: function.namespace.to_string(),
                    });
                }
                if !function.accepts(args.len()) {
                    return Err(CompileError::Arity {
                        function: name.clone(),
                        expected: function.arity(),
                        got: args.len(),
                    });
                }
                args.iter().try_for_each(|arg| self.resolve(arg, session))
            }
        }
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new(Library::standard())
    }
}

impl FallbackExecutor for ScriptEngine {
    fn compile(&self, source: &str, session: &Session) -> Result<Box<dyn Executable>, ConsoleError> {
        let program = self.compile_program(source, session)?;
        tracing::debug!(statements = program.statements.len(), "compiled snippet");
        Ok(Box::new(program))
    }

    fn namespaces(&self) -> Vec<String> {
        self.library
            .namespaces()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// A compiled snippet, ready to run.
pub struct Program {
    statements: Vec<Stmt>,
    library: Arc<Library>,
}

impl Program {
    pub fn execute(&self, session: &mut Session) -> Result<Value, RuntimeError> {
        Evaluator::new(session, &self.library).exec(&self.statements)
    }
}

impl Executable for Program {
    fn run(self: Box<Self>, session: &mut Session) -> Result<Value, ConsoleError> {
        Ok(self.execute(session)?)
    }
}

/// Fallback used when dynamic execution is turned off: every line that matches
/// no command fails to compile.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledFallback;

impl FallbackExecutor for DisabledFallback {
    fn compile(&self, source: &str, _session: &Session) -> Result<Box<dyn Executable>, ConsoleError> {
        let name = source.split_whitespace().next().unwrap_or_default();
        Err(ConsoleError::Compile(format!(
            "unknown command `{}` (snippet evaluation is disabled)",
            name
        )))
    }
}
