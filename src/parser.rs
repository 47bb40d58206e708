//! Recursive-descent parser producing the syntax tree.
//!
//! Each non-terminal has its own routine, and every binary level folds its
//! operands to the left. Declarations are written into the symbol table the
//! moment they are parsed, so every offset exists before code generation
//! starts. There is no error recovery: the first mismatch aborts the parse.

use std::iter::Peekable;

use tracing::debug;

use crate::ast::{BinaryOp, Block, Call, Epilogue, Expr, Function, Param, PrintArg, Program, Stmt};
use crate::codegen;
use crate::config::{Options, ReturnPolicy};
use crate::error::{CompileError, CompileResult};
use crate::symbols::{RETURN_ADDRESS, SymbolTable};
use crate::tokenizer::{Token, TokenKind, Tokenizer};
use crate::ty::{PassMode, Type, WORD_SIZE};

/// Parse a whole source string, registering declarations in `symbols`.
pub fn parse(source: &str, symbols: &mut SymbolTable, options: &Options) -> CompileResult<Program> {
  Parser::new(Tokenizer::new(source), symbols, options).parse()
}

pub struct Parser<'s, I: Iterator<Item = Token>> {
  stream: TokenStream<I>,
  symbols: &'s mut SymbolTable,
  options: &'s Options,
  /// Function whose body is being parsed.
  function: String,
  makes_calls: bool,
}

impl<'s, I: Iterator<Item = Token>> Parser<'s, I> {
  pub fn new(tokens: I, symbols: &'s mut SymbolTable, options: &'s Options) -> Self {
    Self {
      stream: TokenStream::new(tokens),
      symbols,
      options,
      function: String::new(),
      makes_calls: false,
    }
  }

  pub fn parse(mut self) -> CompileResult<Program> {
    let mut functions = Vec::new();
    while !self.stream.is_eof() {
      functions.push(self.parse_function()?);
    }
    Ok(Program {
      entry: self.options.entry.clone(),
      functions,
    })
  }

  fn parse_function(&mut self) -> CompileResult<Function> {
    let return_type = self.parse_type()?;
    let token = self.stream.current().clone();
    let name = self.stream.get_ident()?;
    if codegen::is_reserved_label(&name) {
      return Err(CompileError::unexpected(
        "a function name not reserved for branch labels",
        &token,
      ));
    }
    self.function = name.clone();
    self.makes_calls = false;

    self.stream.skip(TokenKind::LParen)?;
    let mut params = Vec::new();
    if !self.stream.at(TokenKind::RParen) {
      loop {
        params.push(self.parse_param()?);
        if !self.stream.equal(TokenKind::Comma) {
          break;
        }
      }
    }
    self.stream.skip(TokenKind::RParen)?;
    self
      .symbols
      .declare_function(&name, params.iter().map(|param| param.mode).collect())?;

    self.stream.skip(TokenKind::LBrace)?;
    while self.stream.at(TokenKind::Int) {
      self.parse_var_decl()?;
    }
    let mut body = Vec::new();
    while !self.stream.at(TokenKind::RBrace) && !self.stream.is_eof() {
      body.push(self.parse_stmt()?);
    }
    self.stream.skip(TokenKind::RBrace)?;

    if self.makes_calls {
      self.symbols.declare(&name, RETURN_ADDRESS)?;
    }
    let epilogue = match self.options.return_policy {
      ReturnPolicy::EntryExits if name == self.options.entry => Epilogue::Exit,
      ReturnPolicy::EntryExits | ReturnPolicy::Always => Epilogue::Return,
    };

    debug!(
      function = %name,
      params = params.len(),
      statements = body.len(),
      "parsed function"
    );
    Ok(Function {
      name,
      return_type,
      params,
      body,
      makes_calls: self.makes_calls,
      epilogue,
    })
  }

  fn parse_type(&mut self) -> CompileResult<Type> {
    self.stream.skip(TokenKind::Int)?;
    Ok(Type::Int)
  }

  fn parse_param(&mut self) -> CompileResult<Param> {
    let ty = self.parse_type()?;
    let mode = if self.stream.equal(TokenKind::Ampersand) {
      PassMode::Reference
    } else {
      PassMode::Value
    };
    let name = self.stream.get_ident()?;
    match mode {
      PassMode::Value => self.symbols.declare(&self.function, &name)?,
      PassMode::Reference => self.symbols.declare_reference(&self.function, &name)?,
    };
    Ok(Param { ty, name, mode })
  }

  /// `int a, b[10], c;` declares straight into the symbol table; nothing is
  /// left in the tree.
  fn parse_var_decl(&mut self) -> CompileResult<()> {
    self.parse_type()?;
    loop {
      let name = self.stream.get_ident()?;
      if self.stream.equal(TokenKind::LBracket) {
        let len = self.parse_array_len()?;
        self.stream.skip(TokenKind::RBracket)?;
        self.symbols.declare_array(&self.function, &name, len)?;
      } else {
        self.symbols.declare(&self.function, &name)?;
      }
      if !self.stream.equal(TokenKind::Comma) {
        break;
      }
    }
    self.stream.skip(TokenKind::Semicolon)?;
    Ok(())
  }

  /// Lengths whose byte size overflows a word are rejected here; the symbol
  /// table enforces the tighter frame limit.
  fn parse_array_len(&mut self) -> CompileResult<u32> {
    let token = self.stream.current().clone();
    let len = self.stream.get_number()?;
    let max = i64::from(i32::MAX / WORD_SIZE);
    if !(1..=max).contains(&len) {
      return Err(CompileError::unexpected("a positive array length", &token));
    }
    Ok(len as u32)
  }

  fn parse_stmt(&mut self) -> CompileResult<Stmt> {
    match self.stream.current().kind {
      TokenKind::Ident => self.parse_ident_stmt(),
      TokenKind::Cout => {
        self.stream.advance();
        self.stream.skip(TokenKind::ShiftLeft)?;
        let mut args = vec![self.parse_cout_arg()?];
        while self.stream.equal(TokenKind::ShiftLeft) {
          args.push(self.parse_cout_arg()?);
        }
        self.stream.skip(TokenKind::Semicolon)?;
        Ok(Stmt::Print(args))
      }
      TokenKind::If => {
        self.stream.advance();
        let cond = self.parse_condition()?;
        let then_body = self.parse_block()?;
        let else_body = if self.stream.equal(TokenKind::Else) {
          Some(self.parse_block()?)
        } else {
          None
        };
        Ok(Stmt::If {
          cond,
          then_body,
          else_body,
        })
      }
      TokenKind::While => {
        self.stream.advance();
        let cond = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
      }
      TokenKind::Cin => {
        self.stream.advance();
        self.stream.skip(TokenKind::ShiftRight)?;
        let name = self.stream.get_ident()?;
        let index = if self.stream.equal(TokenKind::LBracket) {
          let index = self.parse_expr()?;
          self.stream.skip(TokenKind::RBracket)?;
          Some(index)
        } else {
          None
        };
        self.stream.skip(TokenKind::Semicolon)?;
        Ok(Stmt::Input { name, index })
      }
      _ => Err(CompileError::unexpected("a statement", self.stream.current())),
    }
  }

  /// Statements that start with an identifier: element store, assignment or
  /// a call whose value is discarded.
  fn parse_ident_stmt(&mut self) -> CompileResult<Stmt> {
    let name = self.stream.get_ident()?;

    if self.stream.equal(TokenKind::LBracket) {
      let index = self.parse_expr()?;
      self.stream.skip(TokenKind::RBracket)?;
      self.stream.skip(TokenKind::Assign)?;
      let value = self.parse_expr()?;
      self.stream.skip(TokenKind::Semicolon)?;
      return Ok(Stmt::IndexAssign { name, index, value });
    }

    if self.stream.equal(TokenKind::Assign) {
      let value = self.parse_expr()?;
      self.stream.skip(TokenKind::Semicolon)?;
      // First assignment declares the variable.
      self.symbols.declare(&self.function, &name)?;
      return Ok(Stmt::Assign { name, value });
    }

    if self.stream.equal(TokenKind::LParen) {
      let call = self.parse_call(name)?;
      self.stream.skip(TokenKind::Semicolon)?;
      return Ok(Stmt::Call(call));
    }

    Err(CompileError::unexpected(
      "\"=\", \"[\" or \"(\"",
      self.stream.current(),
    ))
  }

  fn parse_condition(&mut self) -> CompileResult<Expr> {
    self.stream.skip(TokenKind::LParen)?;
    let cond = self.parse_expr()?;
    self.stream.skip(TokenKind::RParen)?;
    Ok(cond)
  }

  fn parse_block(&mut self) -> CompileResult<Block> {
    self.stream.skip(TokenKind::LBrace)?;
    let mut stmts = Vec::new();
    while !self.stream.at(TokenKind::RBrace) && !self.stream.is_eof() {
      stmts.push(self.parse_stmt()?);
    }
    self.stream.skip(TokenKind::RBrace)?;
    Ok(stmts)
  }

  fn parse_cout_arg(&mut self) -> CompileResult<PrintArg> {
    match self.stream.current().kind {
      TokenKind::StringLiteral => Ok(PrintArg::Str(self.stream.advance().text)),
      TokenKind::Endl => {
        self.stream.advance();
        Ok(PrintArg::Endl)
      }
      _ => Ok(PrintArg::Expr(self.parse_expr()?)),
    }
  }

  /// Parse the argument list of a call whose `(` was just consumed.
  fn parse_call(&mut self, callee: String) -> CompileResult<Call> {
    let mut args = Vec::new();
    if !self.stream.equal(TokenKind::RParen) {
      loop {
        args.push(self.parse_expr()?);
        if !self.stream.equal(TokenKind::Comma) {
          break;
        }
      }
      self.stream.skip(TokenKind::RParen)?;
    }
    self.makes_calls = true;
    Ok(Call { callee, args })
  }

  fn parse_expr(&mut self) -> CompileResult<Expr> {
    let mut node = self.parse_bool_term()?;
    while self.stream.equal(TokenKind::OrOr) {
      let rhs = self.parse_bool_term()?;
      node = Expr::binary(BinaryOp::Or, node, rhs);
    }
    Ok(node)
  }

  fn parse_bool_term(&mut self) -> CompileResult<Expr> {
    let mut node = self.parse_rel_expr()?;
    while self.stream.equal(TokenKind::AndAnd) {
      let rhs = self.parse_rel_expr()?;
      node = Expr::binary(BinaryOp::And, node, rhs);
    }
    Ok(node)
  }

  fn parse_rel_expr(&mut self) -> CompileResult<Expr> {
    let mut node = self.parse_arith_expr()?;
    loop {
      let op = match self.stream.current().kind {
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::GreaterEq => BinaryOp::Ge,
        TokenKind::LessEq => BinaryOp::Le,
        TokenKind::NotEq => BinaryOp::Ne,
        TokenKind::EqEq => BinaryOp::Eq,
        _ => break,
      };
      self.stream.advance();
      let rhs = self.parse_arith_expr()?;
      node = Expr::binary(op, node, rhs);
    }
    Ok(node)
  }

  fn parse_arith_expr(&mut self) -> CompileResult<Expr> {
    let mut node = self.parse_arith_term()?;
    loop {
      let op = match self.stream.current().kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        _ => break,
      };
      self.stream.advance();
      let rhs = self.parse_arith_term()?;
      node = Expr::binary(op, node, rhs);
    }
    Ok(node)
  }

  fn parse_arith_term(&mut self) -> CompileResult<Expr> {
    let mut node = self.parse_arith_factor()?;
    loop {
      let op = match self.stream.current().kind {
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        _ => break,
      };
      self.stream.advance();
      let rhs = self.parse_arith_factor()?;
      node = Expr::binary(op, node, rhs);
    }
    Ok(node)
  }

  fn parse_arith_factor(&mut self) -> CompileResult<Expr> {
    match self.stream.current().kind {
      TokenKind::Number => {
        let token = self.stream.current().clone();
        let value = i32::try_from(self.stream.get_number()?)
          .map_err(|_| CompileError::unexpected("a number that fits in 32 bits", &token))?;
        Ok(Expr::Number(value))
      }
      TokenKind::Ident => {
        let name = self.stream.get_ident()?;
        if self.stream.equal(TokenKind::LParen) {
          return Ok(Expr::Call(self.parse_call(name)?));
        }
        if self.stream.equal(TokenKind::LBracket) {
          let index = self.parse_expr()?;
          self.stream.skip(TokenKind::RBracket)?;
          return Ok(Expr::index(name, index));
        }
        Ok(Expr::Var(name))
      }
      TokenKind::LParen => {
        self.stream.advance();
        let node = self.parse_expr()?;
        self.stream.skip(TokenKind::RParen)?;
        Ok(node)
      }
      _ => Err(CompileError::unexpected("an expression", self.stream.current())),
    }
  }
}

/// Cursor over the lazy token stream with one token of lookahead.
struct TokenStream<I: Iterator<Item = Token>> {
  tokens: Peekable<I>,
  current: Token,
}

impl<I: Iterator<Item = Token>> TokenStream<I> {
  fn new(tokens: I) -> Self {
    let mut tokens = tokens.peekable();
    let current = tokens.next().unwrap_or_else(|| eof_at(1, 1));
    Self { tokens, current }
  }

  fn current(&self) -> &Token {
    &self.current
  }

  /// Move to the next token, returning the one just consumed. A stream that
  /// runs dry keeps answering `Eof` at the last known position.
  fn advance(&mut self) -> Token {
    let next = self
      .tokens
      .next()
      .unwrap_or_else(|| eof_at(self.current.line, self.current.column));
    std::mem::replace(&mut self.current, next)
  }

  fn at(&self, kind: TokenKind) -> bool {
    self.current.kind == kind
  }

  /// Consume the current token if it has the given kind.
  fn equal(&mut self, kind: TokenKind) -> bool {
    if self.at(kind) {
      self.advance();
      return true;
    }
    false
  }

  /// Consume a token of the given kind or fail with a syntax error naming
  /// what was found instead.
  fn skip(&mut self, kind: TokenKind) -> CompileResult<Token> {
    if self.at(kind) {
      Ok(self.advance())
    } else {
      Err(CompileError::unexpected(kind.describe(), &self.current))
    }
  }

  fn get_ident(&mut self) -> CompileResult<String> {
    Ok(self.skip(TokenKind::Ident)?.text)
  }

  /// Numeric literals may carry a fraction; the value is truncated toward zero.
  fn get_number(&mut self) -> CompileResult<i64> {
    let token = self.skip(TokenKind::Number)?;
    let value = token
      .text
      .parse::<f64>()
      .map_err(|_| CompileError::unexpected("a number", &token))?;
    Ok(value.trunc() as i64)
  }

  fn is_eof(&self) -> bool {
    self.at(TokenKind::Eof)
  }
}

fn eof_at(line: u32, column: u32) -> Token {
  Token {
    kind: TokenKind::Eof,
    text: String::new(),
    line,
    column,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse_ok(source: &str) -> (Program, SymbolTable) {
    let mut symbols = SymbolTable::default();
    let program = parse(source, &mut symbols, &Options::default()).unwrap();
    (program, symbols)
  }

  fn parse_err(source: &str) -> CompileError {
    let mut symbols = SymbolTable::default();
    parse(source, &mut symbols, &Options::default()).unwrap_err()
  }

  fn main_body(source: &str) -> Block {
    let (mut program, _) = parse_ok(source);
    program.functions.remove(0).body
  }

  #[test]
  fn binary_levels_are_left_associative() {
    let body = main_body("int main() { x = 1 - 2 - 3; }");
    let Stmt::Assign { value, .. } = &body[0] else {
      panic!("expected assignment, got {body:?}");
    };
    assert_eq!(
      *value,
      Expr::binary(
        BinaryOp::Sub,
        Expr::binary(BinaryOp::Sub, Expr::Number(1), Expr::Number(2)),
        Expr::Number(3),
      )
    );
  }

  #[test]
  fn multiplication_binds_tighter_than_addition() {
    let body = main_body("int main() { x = 1 + 2 * 3; }");
    let Stmt::Assign { value, .. } = &body[0] else {
      panic!("expected assignment");
    };
    assert_eq!(
      *value,
      Expr::binary(
        BinaryOp::Add,
        Expr::Number(1),
        Expr::binary(BinaryOp::Mul, Expr::Number(2), Expr::Number(3)),
      )
    );
  }

  #[test]
  fn or_binds_loosest() {
    let body = main_body("int main() { x = 1 < 2 && 3 || 4 == 5; }");
    let Stmt::Assign { value, .. } = &body[0] else {
      panic!("expected assignment");
    };
    let Expr::Binary { op, lhs, .. } = value else {
      panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Or);
    assert!(matches!(**lhs, Expr::Binary { op: BinaryOp::And, .. }));
  }

  #[test]
  fn fractional_literals_are_truncated() {
    let body = main_body("int main() { x = 3.9; }");
    assert_eq!(
      body[0],
      Stmt::Assign {
        name: "x".into(),
        value: Expr::Number(3)
      }
    );
  }

  #[test]
  fn declarations_reach_the_symbol_table_in_order() {
    let (_, symbols) = parse_ok("int f(int a, int &b) { int c, d[3], e; c = 1; }");
    assert_eq!(symbols.offset_of("f", "a").unwrap(), 0);
    assert_eq!(symbols.offset_of("f", "b").unwrap(), 4);
    assert_eq!(symbols.offset_of("f", "c").unwrap(), 8);
    assert_eq!(symbols.offset_of("f", "d").unwrap(), 12);
    assert_eq!(symbols.offset_of("f", "e").unwrap(), 24);
    assert_eq!(
      symbols.function("f").unwrap().params,
      vec![PassMode::Value, PassMode::Reference]
    );
  }

  #[test]
  fn assignment_auto_declares() {
    let (_, symbols) = parse_ok("int main() { y = 2; }");
    assert_eq!(symbols.offset_of("main", "y").unwrap(), 0);
  }

  #[test]
  fn calls_reserve_a_return_address_slot() {
    let (program, symbols) = parse_ok("int f() { } int main() { int x; f(); x = f(); }");
    assert!(!program.functions[0].makes_calls);
    assert!(program.functions[1].makes_calls);
    assert_eq!(symbols.offset_of("main", RETURN_ADDRESS).unwrap(), 4);
    assert!(!symbols.is_declared("f", RETURN_ADDRESS));
  }

  #[test]
  fn statements_of_every_kind() {
    let body = main_body(
      r#"int main() {
        int a[4], i;
        a[0] = 1;
        cout << "i=" << i << endl;
        cin >> i;
        cin >> a[i];
        if (i > 0) { i = 0; } else { i = 1; }
        while (i < 3) { i = i + 1; }
      }"#,
    );
    assert!(matches!(body[0], Stmt::IndexAssign { .. }));
    assert_eq!(
      body[1],
      Stmt::Print(vec![
        PrintArg::Str("\"i=\"".into()),
        PrintArg::Expr(Expr::Var("i".into())),
        PrintArg::Endl,
      ])
    );
    assert_eq!(
      body[2],
      Stmt::Input {
        name: "i".into(),
        index: None
      }
    );
    assert!(matches!(body[3], Stmt::Input { index: Some(_), .. }));
    assert!(matches!(body[4], Stmt::If { else_body: Some(_), .. }));
    assert!(matches!(body[5], Stmt::While { .. }));
  }

  #[test]
  fn epilogue_follows_the_return_policy() {
    let (program, _) = parse_ok("int f() { } int main() { }");
    assert_eq!(program.functions[0].epilogue, Epilogue::Return);
    assert_eq!(program.functions[1].epilogue, Epilogue::Exit);

    let options = Options {
      return_policy: ReturnPolicy::Always,
      ..Options::default()
    };
    let mut symbols = SymbolTable::default();
    let program = parse("int main() { }", &mut symbols, &options).unwrap();
    assert_eq!(program.functions[0].epilogue, Epilogue::Return);
  }

  #[test]
  fn missing_semicolon_names_the_found_token() {
    let err = parse_err("int main() {\n  int x;\n  x = 1\n}");
    assert!(matches!(err, CompileError::Syntax { .. }));
    assert_eq!(err.position(), Some((4, 1)));
  }

  #[test]
  fn unmatched_brace_hits_end_of_input() {
    let err = parse_err("int main() {\n  x = 1;\n");
    let CompileError::Syntax { found, line, .. } = err else {
      panic!("expected syntax error");
    };
    assert_eq!(found, "end of input");
    assert_eq!(line, 3);
  }

  #[test]
  fn assignment_without_target_is_rejected() {
    let err = parse_err("int main() {\n  = 5;\n}");
    assert_eq!(err.position(), Some((2, 3)));
  }

  #[test]
  fn malformed_token_is_a_lexical_error() {
    let err = parse_err("int main() { x = 1 $ 2; }");
    assert!(matches!(err, CompileError::Lexical { .. }));
  }

  #[test]
  fn zero_length_array_is_rejected() {
    let err = parse_err("int main() { int a[0]; }");
    assert!(matches!(err, CompileError::Syntax { .. }));
  }

  #[test]
  fn literals_must_fit_a_word() {
    let body = main_body("int main() { x = 2147483647; }");
    assert_eq!(
      body[0],
      Stmt::Assign {
        name: "x".into(),
        value: Expr::Number(i32::MAX)
      }
    );
    for source in [
      "int main() { x = 2147483648; }",
      "int main() { x = 99999999999999999999; }",
    ] {
      let err = parse_err(source);
      assert!(matches!(err, CompileError::Syntax { .. }));
      assert_eq!(err.position(), Some((1, 18)));
    }
  }

  #[test]
  fn array_lengths_past_a_word_are_syntax_errors() {
    for source in [
      "int main() { int a[600000000]; }",
      "int main() { int a[4294967295], b; }",
    ] {
      let err = parse_err(source);
      assert!(matches!(err, CompileError::Syntax { .. }));
      assert_eq!(err.position(), Some((1, 20)));
    }
  }

  #[test]
  fn arrays_larger_than_a_frame_are_rejected() {
    let err = parse_err("int main() { int a[100000]; }");
    assert!(matches!(err, CompileError::FrameTooLarge { .. }));
  }

  #[test]
  fn branch_label_names_cannot_be_functions() {
    let err = parse_err("int while_end_0() { } int main() { }");
    assert!(matches!(err, CompileError::Syntax { .. }));
    assert_eq!(err.position(), Some((1, 5)));
    parse_ok("int while_end() { } int else_x() { } int main() { }");
  }

  #[test]
  fn duplicate_functions_are_rejected() {
    let err = parse_err("int f() { } int f() { }");
    assert!(matches!(err, CompileError::DuplicateFunction { .. }));
  }
}
