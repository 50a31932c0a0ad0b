use crate::script::library::{CallContext, Library};
use crate::script::parser::{BinaryOp, Expr, Stmt, UnaryOp};
use crate::session::Session;
use crate::value::Value;
use thiserror::Error;

/// Failures raised while running a compiled snippet.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("variable `{0}` is undefined")]
    UndefinedVariable(String),

    #[error("cannot apply `{op}` to {lhs} and {rhs}")]
    TypeMismatch {
        op: BinaryOp,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("cannot apply `{op}` to {operand}")]
    InvalidOperand { op: UnaryOp, operand: &'static str },

    #[error("division by zero")]
    DivisionByZero,

    #[error("{function}: {message}")]
    Function { function: String, message: String },
}

impl RuntimeError {
    pub fn function(function: &str, message: impl Into<String>) -> Self {
        RuntimeError::Function {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Tree-walking evaluator over a session.
pub(crate) struct Evaluator<'a> {
    session: &'a mut Session,
    library: &'a Library,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(session: &'a mut Session, library: &'a Library) -> Self {
        Self { session, library }
    }

    /// Run statements in order; the program's value is the last statement's.
    pub(crate) fn exec(&mut self, statements: &[Stmt]) -> Result<Value, RuntimeError> {
        let mut last = Value::Null;
        for statement in statements {
            last = match statement {
                Stmt::Assign { name, value } => {
                    let value = self.eval(value)?;
                    self.session.variables.assign(name.clone(), value.clone());
                    value
                }
                Stmt::Expr(expr) => self.eval(expr)?,
            };
        }
        Ok(last)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => self
                .session
                .variables
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                unary(*op, value)
            }
            Expr::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => match self.eval(lhs)? {
                Value::Bool(false) => Ok(Value::Bool(false)),
                Value::Bool(true) => self.eval_bool(BinaryOp::And, rhs),
                other => Err(mismatch(BinaryOp::And, &other, &Value::Bool(true))),
            },
            Expr::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => match self.eval(lhs)? {
                Value::Bool(true) => Ok(Value::Bool(true)),
                Value::Bool(false) => self.eval_bool(BinaryOp::Or, rhs),
                other => Err(mismatch(BinaryOp::Or, &other, &Value::Bool(true))),
            },
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs)
            }
            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                // Resolved while compiling; a miss here means the library changed underneath.
                let function = self
                    .library
                    .function(name)
                    .ok_or_else(|| RuntimeError::function(name, "function is not defined"))?;
                let mut ctx = CallContext {
                    session: &mut *self.session,
                    factories: self.library.factories(),
                };
                (function.call)(&mut ctx, &values)
            }
        }
    }

    /// Right operand of `&&`/`||`, which must itself be a boolean.
    fn eval_bool(&mut self, op: BinaryOp, rhs: &Expr) -> Result<Value, RuntimeError> {
        match self.eval(rhs)? {
            Value::Bool(b) => Ok(Value::Bool(b)),
            other => Err(mismatch(op, &Value::Bool(true), &other)),
        }
    }
}

fn mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        op,
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, RuntimeError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, other) => Err(RuntimeError::InvalidOperand {
            op,
            operand: other.type_name(),
        }),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    use BinaryOp::*;

    match (op, &lhs, &rhs) {
        (Eq, _, _) => Ok(Value::Bool(lhs == rhs)),
        (Ne, _, _) => Ok(Value::Bool(lhs != rhs)),

        (Add, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Add, Value::Text(_), _) | (Add, _, Value::Text(_)) => {
            Ok(Value::Text(format!("{}{}", lhs, rhs)))
        }
        (Sub, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
        (Mul, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
        (Div | Rem, Value::Number(_), Value::Number(b)) if *b == 0.0 => {
            Err(RuntimeError::DivisionByZero)
        }
        (Div, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
        (Rem, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),

        (Lt | Le | Gt | Ge, Value::Number(a), Value::Number(b)) => Ok(Value::Bool(compare(op, a, b))),
        (Lt | Le | Gt | Ge, Value::Text(a), Value::Text(b)) => Ok(Value::Bool(compare(op, a, b))),

        _ => Err(mismatch(op, &lhs, &rhs)),
    }
}

fn compare<T: PartialOrd + ?Sized>(op: BinaryOp, a: &T, b: &T) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}
