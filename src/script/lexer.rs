//! Lexical analysis (tokenization) for console snippets.

use std::fmt;
use thiserror::Error;

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A numeric literal such as `42` or `2.5`.
    Number(f64),
    /// A string literal with escapes already resolved.
    Str(String),
    /// A bare name: keyword literal or function name.
    Ident(String),
    /// A session variable, including its leading `$`.
    Variable(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    /// `=`
    Assign,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    LParen,
    RParen,
    Comma,
    Semicolon,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Token::Number(n) => return write!(f, "{}", n),
            Token::Str(s) => return write!(f, "{:?}", s),
            Token::Ident(name) | Token::Variable(name) => return write!(f, "{}", name),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Bang => "!",
            Token::Assign => "=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Semicolon => ";",
        };
        f.write_str(symbol)
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated string literal")]
    UnfinishedString,
    /// A character that starts no token.
    #[error("unexpected character `{0}` at position {1}")]
    UnexpectedChar(char, usize),
    /// Digits and dots that do not form a number, e.g. `1.2.3`.
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    /// `$` not followed by a valid name.
    #[error("expected a variable name after `$` at position {0}")]
    EmptyVariableName(usize),
    /// Backslash followed by a character with no escape meaning.
    #[error("unknown escape `\\{0}` in string literal")]
    UnknownEscape(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingNumber,
    ReadingIdent,
    ReadingVariable,
    ReadingString(char),
    ReadingEscape(char),
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    out: Vec<Token>,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            out: Vec::new(),
        }
    }

    /// Runs the machine over the whole input.
    fn make_tokens(mut self) -> Result<Vec<Token>, LexingError> {
        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch)?,
                LexingState::ReadingNumber => self.handle_number(ch)?,
                LexingState::ReadingIdent => self.handle_ident(ch)?,
                LexingState::ReadingVariable => self.handle_variable(ch)?,
                LexingState::ReadingString(quote) => self.handle_string(ch, quote),
                LexingState::ReadingEscape(quote) => self.handle_escape(ch, quote)?,
            }
        }

        match self.state {
            LexingState::ReadingString(_) | LexingState::ReadingEscape(_) => {
                return Err(LexingError::UnfinishedString);
            }
            LexingState::ReadingNumber => self.finish_number()?,
            LexingState::ReadingIdent => self.finish_ident(),
            LexingState::ReadingVariable => self.finish_variable()?,
            LexingState::Start => {}
        }

        Ok(self.out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    /// Consume the next char if it equals `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn handle_start(&mut self, ch: char) -> Result<(), LexingError> {
        let token = match ch {
            c if c.is_whitespace() => return Ok(()),
            c if c.is_ascii_digit() => {
                self.buffer.push(c);
                self.state = LexingState::ReadingNumber;
                return Ok(());
            }
            c if c.is_alphabetic() || c == '_' => {
                self.buffer.push(c);
                self.state = LexingState::ReadingIdent;
                return Ok(());
            }
            '$' => {
                self.state = LexingState::ReadingVariable;
                return Ok(());
            }
            '"' | '\'' => {
                self.state = LexingState::ReadingString(ch);
                return Ok(());
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '=' if self.eat('=') => Token::EqEq,
            '=' => Token::Assign,
            '!' if self.eat('=') => Token::NotEq,
            '!' => Token::Bang,
            '<' if self.eat('=') => Token::Le,
            '<' => Token::Lt,
            '>' if self.eat('=') => Token::Ge,
            '>' => Token::Gt,
            '&' if self.eat('&') => Token::AndAnd,
            '|' if self.eat('|') => Token::OrOr,
            other => return Err(LexingError::UnexpectedChar(other, self.pos - 1)),
        };
        self.out.push(token);
        Ok(())
    }

    fn handle_number(&mut self, ch: char) -> Result<(), LexingError> {
        if ch.is_ascii_digit() || ch == '.' {
            self.buffer.push(ch);
            return Ok(());
        }
        self.finish_number()?;
        self.handle_start(ch)
    }

    fn handle_ident(&mut self, ch: char) -> Result<(), LexingError> {
        if ch.is_alphanumeric() || ch == '_' {
            self.buffer.push(ch);
            return Ok(());
        }
        self.finish_ident();
        self.handle_start(ch)
    }

    fn handle_variable(&mut self, ch: char) -> Result<(), LexingError> {
        let continues_name = ch.is_alphabetic()
            || ch == '_'
            || (ch.is_ascii_digit() && !self.buffer.is_empty());
        if continues_name {
            self.buffer.push(ch);
            return Ok(());
        }
        self.finish_variable()?;
        self.handle_start(ch)
    }

    fn handle_string(&mut self, ch: char, quote: char) {
        if ch == '\\' {
            self.state = LexingState::ReadingEscape(quote);
        } else if ch == quote {
            self.out.push(Token::Str(std::mem::take(&mut self.buffer)));
            self.state = LexingState::Start;
        } else {
            self.buffer.push(ch);
        }
    }

    fn handle_escape(&mut self, ch: char, quote: char) -> Result<(), LexingError> {
        let resolved = match ch {
            'n' => '\n',
            't' => '\t',
            '\\' | '"' | '\'' => ch,
            other => return Err(LexingError::UnknownEscape(other)),
        };
        self.buffer.push(resolved);
        self.state = LexingState::ReadingString(quote);
        Ok(())
    }

    fn finish_number(&mut self) -> Result<(), LexingError> {
        let text = std::mem::take(&mut self.buffer);
        let n = text
            .parse::<f64>()
            .map_err(|_| LexingError::InvalidNumber(text.clone()))?;
        self.out.push(Token::Number(n));
        self.state = LexingState::Start;
        Ok(())
    }

    fn finish_ident(&mut self) {
        self.out.push(Token::Ident(std::mem::take(&mut self.buffer)));
        self.state = LexingState::Start;
    }

    fn finish_variable(&mut self) -> Result<(), LexingError> {
        if self.buffer.is_empty() {
            return Err(LexingError::EmptyVariableName(self.pos));
        }
        let name = format!("${}", std::mem::take(&mut self.buffer));
        self.out.push(Token::Variable(name));
        self.state = LexingState::Start;
        Ok(())
    }
}

/// Splits a snippet into tokens.
///
/// # Returns
/// A `Result<Vec<Token>, LexingError>`: the tokens on success, or a `LexingError`
/// if an incomplete structure (like an unclosed quote) is found.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    LexingFSM::new(line).make_tokens()
}
