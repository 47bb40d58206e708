//! Shared error type used across the compilation pipeline.
//!
//! Every stage returns `CompileResult`; the first error aborts the whole
//! compilation unit. Only the binary turns an error into an exit code.

use std::path::PathBuf;

use snafu::Snafu;

use crate::tokenizer::{Token, TokenKind};

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("lexical error at line {line}, column {column}: unexpected {lexeme:?}"))]
  Lexical {
    lexeme: String,
    line: u32,
    column: u32,
  },

  #[snafu(display(
    "syntax error at line {line}, column {column}: expected {expected}, but found {found}"
  ))]
  Syntax {
    expected: String,
    found: String,
    line: u32,
    column: u32,
  },

  #[snafu(display("unknown symbol `{name}` in function `{function}`"))]
  UnknownSymbol { function: String, name: String },

  #[snafu(display("call to undefined function `{name}`"))]
  UnknownFunction { name: String },

  #[snafu(display("function `{name}` is defined more than once"))]
  DuplicateFunction { name: String },

  #[snafu(display("function `{function}` expects {expected} argument(s), but got {found}"))]
  ArgumentCount {
    function: String,
    expected: usize,
    found: usize,
  },

  #[snafu(display(
    "argument {position} of `{function}` is passed by reference and must name a variable"
  ))]
  ReferenceArgument { function: String, position: usize },

  #[snafu(display("`{name}` in function `{function}` is not {expected}"))]
  SlotKind {
    function: String,
    name: String,
    expected: &'static str,
  },

  #[snafu(display("stack frame of `{function}` would exceed {limit} bytes"))]
  FrameTooLarge { function: String, limit: i32 },

  #[snafu(display("entry function `{name}` is not defined"))]
  MissingEntry { name: String },

  #[snafu(display("expression needs more than {capacity} temporary registers"))]
  RegistersExhausted { capacity: usize },

  #[snafu(display("register {register} is not a temporary register"))]
  ForeignRegister { register: String },

  #[snafu(display("register {register} is already free"))]
  DoubleFree { register: String },

  #[snafu(display("register pool size must be between 1 and {max}, got {requested}"))]
  InvalidRegisterCount { requested: usize, max: usize },

  #[snafu(display("cannot read {}: {source}", path.display()))]
  ReadSource {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("{} is empty", path.display()))]
  EmptySource { path: PathBuf },

  #[snafu(display("cannot write {}: {source}", path.display()))]
  WriteOutput {
    path: PathBuf,
    source: std::io::Error,
  },
}

impl CompileError {
  /// Construct the error for a token that does not fit the grammar position.
  ///
  /// Error tokens coming from the scanner are reported as lexical errors
  /// instead, since the grammar never had a chance to look at them.
  pub fn unexpected(expected: impl Into<String>, found: &Token) -> Self {
    if found.kind == TokenKind::Error {
      return Self::Lexical {
        lexeme: found.text.clone(),
        line: found.line,
        column: found.column,
      };
    }
    Self::Syntax {
      expected: expected.into(),
      found: found.describe(),
      line: found.line,
      column: found.column,
    }
  }

  /// Source position carried by the error, if any.
  pub fn position(&self) -> Option<(u32, u32)> {
    match self {
      Self::Lexical { line, column, .. } | Self::Syntax { line, column, .. } => {
        Some((*line, *column))
      }
      _ => None,
    }
  }
}
