//! One compilation unit's mutable state.
//!
//! The register pool, the symbol table and the label counters live here
//! rather than in globals, so independent sessions never interfere.

use crate::codegen::Emit;
use crate::config::Options;
use crate::error::CompileResult;
use crate::parser::Parser;
use crate::registers::RegisterPool;
use crate::symbols::{Slot, SymbolTable};
use crate::tokenizer::Tokenizer;

#[derive(Debug)]
pub struct Session {
  pub registers: RegisterPool,
  pub symbols: SymbolTable,
  options: Options,
  if_labels: u32,
  while_labels: u32,
  function: String,
}

impl Session {
  pub fn new(options: Options) -> CompileResult<Self> {
    Ok(Self {
      registers: RegisterPool::with_capacity(options.registers)?,
      symbols: SymbolTable::new(options.frame_layout),
      options,
      if_labels: 0,
      while_labels: 0,
      function: String::new(),
    })
  }

  pub fn options(&self) -> &Options {
    &self.options
  }

  /// Parse `source` into this session's symbol table, then generate the
  /// whole program.
  pub fn compile(&mut self, source: &str) -> CompileResult<String> {
    let program = Parser::new(Tokenizer::new(source), &mut self.symbols, &self.options).parse()?;
    Ok(program.emit(self)?.code)
  }

  pub(crate) fn next_if_label(&mut self) -> u32 {
    let n = self.if_labels;
    self.if_labels += 1;
    n
  }

  pub(crate) fn next_while_label(&mut self) -> u32 {
    let n = self.while_labels;
    self.while_labels += 1;
    n
  }

  pub(crate) fn enter_function(&mut self, name: &str) {
    self.function.clear();
    self.function.push_str(name);
  }

  /// Function whose body is being generated.
  pub fn function(&self) -> &str {
    &self.function
  }

  /// Slot of `name` in the function being generated.
  pub fn slot(&self, name: &str) -> CompileResult<Slot> {
    self.symbols.slot(&self.function, name)
  }
}
