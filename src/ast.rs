//! Syntax tree produced by the parser and consumed once by code generation.
//!
//! Every node owns its children outright, so the tree is dropped recursively
//! with no bookkeeping.

use crate::ty::{PassMode, Type};

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  Lt,
  Gt,
  Le,
  Ge,
  Eq,
  Ne,
  And,
  Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Number(i32),
  Var(String),
  Index {
    name: String,
    index: Box<Expr>,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  Call(Call),
}

impl Expr {
  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn index(name: impl Into<String>, index: Expr) -> Self {
    Self::Index {
      name: name.into(),
      index: Box::new(index),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
  pub callee: String,
  pub args: Vec<Expr>,
}

/// One operand of a `cout << ...` chain.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintArg {
  Expr(Expr),
  /// Raw literal text, quotes and escapes included.
  Str(String),
  Endl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  Assign {
    name: String,
    value: Expr,
  },
  IndexAssign {
    name: String,
    index: Expr,
    value: Expr,
  },
  Call(Call),
  Print(Vec<PrintArg>),
  Input {
    name: String,
    index: Option<Expr>,
  },
  If {
    cond: Expr,
    then_body: Block,
    else_body: Option<Block>,
  },
  While {
    cond: Expr,
    body: Block,
  },
}

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
  pub ty: Type,
  pub name: String,
  pub mode: PassMode,
}

/// How a function body hands control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epilogue {
  Return,
  Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  pub name: String,
  pub return_type: Type,
  pub params: Vec<Param>,
  pub body: Block,
  /// The body contains a call, so `$ra` must survive it.
  pub makes_calls: bool,
  pub epilogue: Epilogue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  pub entry: String,
  pub functions: Vec<Function>,
}
