use crate::script::lexer::Token;
use crate::value::Value;
use std::fmt;
use thiserror::Error;

/// Parentheses and call arguments may nest at most this deep.
pub const MAX_DEPTH: usize = 64;

/// A statement of a snippet.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `$name = value`. Evaluates to the assigned value.
    Assign { name: String, value: Expr },
    /// Any other expression.
    Expr(Expr),
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        })
    }
}

/// Errors that can occur during the AST construction (parsing) phase.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParsingError {
    /// Encountered a token that was not expected at the current position.
    #[error("unexpected `{0}`")]
    UnexpectedToken(Token),
    /// Reached the end of the snippet in the middle of an expression.
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// The snippet holds no statement at all.
    #[error("nothing to evaluate")]
    Empty,
    /// A bare name that is neither a literal keyword nor a function call.
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    /// Parentheses or calls nested deeper than [`MAX_DEPTH`].
    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

struct AstBuilder {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl AstBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        AstBuilder {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse a program: statement (';' statement?)*
    fn build_ast(mut self) -> Result<Vec<Stmt>, ParsingError> {
        let mut statements = Vec::new();
        loop {
            while self.peek() == Some(&Token::Semicolon) {
                self.consume();
            }
            if self.peek().is_none() {
                break;
            }
            statements.push(self.parse_statement()?);
            match self.consume() {
                None | Some(Token::Semicolon) => {}
                Some(token) => return Err(ParsingError::UnexpectedToken(token)),
            }
        }

        if statements.is_empty() {
            return Err(ParsingError::Empty);
        }
        Ok(statements)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Helper to look ahead n tokens
    fn peek_n(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParsingError> {
        match self.consume() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ParsingError::UnexpectedToken(token)),
            None => Err(ParsingError::UnexpectedEnd),
        }
    }

    /// Parse a statement: variable '=' expr | expr
    fn parse_statement(&mut self) -> Result<Stmt, ParsingError> {
        if let (Some(Token::Variable(name)), Some(Token::Assign)) = (self.peek(), self.peek_n(1)) {
            let name = name.clone();
            self.pos += 2;
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign { name, value });
        }
        Ok(Stmt::Expr(self.parse_expr()?))
    }

    fn parse_expr(&mut self) -> Result<Expr, ParsingError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParsingError::TooDeep(MAX_DEPTH));
        }
        let expr = self.parse_or();
        self.depth -= 1;
        expr
    }

    /// Left-associative binary level: next (op next)*
    fn parse_binary_level(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ParsingError>,
    ) -> Result<Expr, ParsingError> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.peek() == Some(token) {
                    self.consume();
                    let rhs = next(self)?;
                    lhs = Expr::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParsingError> {
        self.parse_binary_level(&[(Token::OrOr, BinaryOp::Or)], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, ParsingError> {
        self.parse_binary_level(&[(Token::AndAnd, BinaryOp::And)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParsingError> {
        self.parse_binary_level(
            &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::Ne)],
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParsingError> {
        self.parse_binary_level(
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::Le, BinaryOp::Le),
                (Token::Gt, BinaryOp::Gt),
                (Token::Ge, BinaryOp::Ge),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, ParsingError> {
        self.parse_binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParsingError> {
        self.parse_binary_level(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
            Self::parse_unary,
        )
    }

    /// Parse prefix operators iteratively so long chains cannot exhaust the stack.
    fn parse_unary(&mut self) -> Result<Expr, ParsingError> {
        let mut ops = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Minus) => ops.push(UnaryOp::Neg),
                Some(Token::Bang) => ops.push(UnaryOp::Not),
                _ => break,
            }
            self.consume();
        }
        if ops.len() > MAX_DEPTH {
            return Err(ParsingError::TooDeep(MAX_DEPTH));
        }

        let mut expr = self.parse_primary()?;
        for op in ops.into_iter().rev() {
            expr = Expr::Unary {
                op,
                operand: Box::new(expr),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParsingError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Text(s))),
            Some(Token::Variable(name)) => Ok(Expr::Variable(name)),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.consume();
                    let args = self.parse_call_args()?;
                    return Ok(Expr::Call { name, args });
                }
                match name.as_str() {
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" => Ok(Expr::Literal(Value::Null)),
                    _ => Err(ParsingError::UnknownIdentifier(name)),
                }
            }
            Some(token) => Err(ParsingError::UnexpectedToken(token)),
            None => Err(ParsingError::UnexpectedEnd),
        }
    }

    /// Parse call arguments after '(' up to and including ')'.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParsingError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.consume();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.consume() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(token) => return Err(ParsingError::UnexpectedToken(token)),
                None => return Err(ParsingError::UnexpectedEnd),
            }
        }
    }
}

/// Constructs the statement list of a snippet from its tokens.
///
/// # Returns
///
/// * `Result<Vec<Stmt>, ParsingError>` - the statements in source order, or
///   the first syntactic issue encountered.
pub fn construct_ast(tokens: Vec<Token>) -> Result<Vec<Stmt>, ParsingError> {
    AstBuilder::from(tokens).build_ast()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::split_into_tokens;

    fn parse(s: &str) -> Result<Vec<Stmt>, ParsingError> {
        construct_ast(split_into_tokens(s).unwrap())
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Number(n)))
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let ast = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            ast,
            vec![Stmt::Expr(Expr::Binary {
                op: BinaryOp::Add,
                lhs: num(1.0),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: num(2.0),
                    rhs: num(3.0),
                }),
            })]
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let ast = parse("8 - 4 - 2").unwrap();
        assert_eq!(
            ast,
            vec![Stmt::Expr(Expr::Binary {
                op: BinaryOp::Sub,
                lhs: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    lhs: num(8.0),
                    rhs: num(4.0),
                }),
                rhs: num(2.0),
            })]
        );
    }

    #[test]
    fn test_assignment_and_statements() {
        let ast = parse("$a = 1;; $a;").unwrap();
        assert_eq!(
            ast,
            vec![
                Stmt::Assign {
                    name: "$a".to_string(),
                    value: *num(1.0),
                },
                Stmt::Expr(Expr::Variable("$a".to_string())),
            ]
        );
    }

    #[test]
    fn test_call_with_arguments() {
        let ast = parse("max(1, -x())").unwrap();
        assert_eq!(
            ast,
            vec![Stmt::Expr(Expr::Call {
                name: "max".to_string(),
                args: vec![
                    *num(1.0),
                    Expr::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(Expr::Call {
                            name: "x".to_string(),
                            args: vec![],
                        }),
                    },
                ],
            })]
        );
    }

    #[test]
    fn test_bare_identifier_is_rejected() {
        assert_eq!(
            parse("echo"),
            Err(ParsingError::UnknownIdentifier("echo".to_string()))
        );
        assert_eq!(
            parse("echo hello"),
            Err(ParsingError::UnknownIdentifier("echo".to_string()))
        );
    }

    #[test]
    fn test_keywords_are_literals() {
        assert_eq!(
            parse("null").unwrap(),
            vec![Stmt::Expr(Expr::Literal(Value::Null))]
        );
        assert_eq!(
            parse("true").unwrap(),
            vec![Stmt::Expr(Expr::Literal(Value::Bool(true)))]
        );
    }

    #[test]
    fn test_empty_and_incomplete_input() {
        assert_eq!(parse(""), Err(ParsingError::Empty));
        assert_eq!(parse(" ; ;"), Err(ParsingError::Empty));
        assert_eq!(parse("1 +"), Err(ParsingError::UnexpectedEnd));
        assert_eq!(parse("(1"), Err(ParsingError::UnexpectedEnd));
        assert_eq!(
            parse("1 2"),
            Err(ParsingError::UnexpectedToken(Token::Number(2.0)))
        );
        assert_eq!(
            parse("$a = = 1"),
            Err(ParsingError::UnexpectedToken(Token::Assign))
        );
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(parse(&deep), Err(ParsingError::TooDeep(MAX_DEPTH)));

        let ok = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert!(parse(&ok).is_ok());

        let negations = format!("{}1", "-".repeat(MAX_DEPTH + 1));
        assert_eq!(parse(&negations), Err(ParsingError::TooDeep(MAX_DEPTH)));
    }
}
