//! Symbol table: stack-slot layout for variables, function signatures and a
//! small value store.
//!
//! Variables are keyed by `(function, variable)`. Offsets are handed out in
//! first-seen order in word-sized steps, so redeclaring a name never moves it.

use std::collections::HashMap;

use snafu::{OptionExt, ensure};
use tracing::trace;

use crate::config::FrameLayout;
use crate::error::{
  CompileResult, DuplicateFunctionSnafu, FrameTooLargeSnafu, UnknownFunctionSnafu,
  UnknownSymbolSnafu,
};
use crate::ty::{PassMode, WORD_SIZE};

/// Largest frame whose offsets still fit the signed 16-bit immediate of
/// `addi`, `lw` and `sw`.
pub const MAX_FRAME_SIZE: i32 = i16::MAX as i32;

/// Hidden slot holding the saved return address of functions that call others.
/// The `$` keeps it out of the identifier namespace.
pub const RETURN_ADDRESS: &str = "$ra";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
  Scalar,
  /// `len` consecutive words, element 0 at the slot offset.
  Array(u32),
  /// Holds the address of the caller's variable.
  Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
  pub offset: i32,
  pub kind: SlotKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
  pub params: Vec<PassMode>,
}

#[derive(Debug, Default)]
struct Scope {
  slots: HashMap<String, Slot>,
  cursor: i32,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
  layout: FrameLayout,
  cursor: i32,
  scopes: HashMap<String, Scope>,
  values: HashMap<String, HashMap<String, i64>>,
  functions: HashMap<String, Signature>,
}

impl SymbolTable {
  pub fn new(layout: FrameLayout) -> Self {
    Self {
      layout,
      ..Self::default()
    }
  }

  /// Give `variable` a scalar slot in `function` unless it already has one.
  /// Returns the slot offset either way.
  pub fn declare(&mut self, function: &str, variable: &str) -> CompileResult<i32> {
    self.declare_slot(function, variable, SlotKind::Scalar)
  }

  pub fn declare_array(&mut self, function: &str, variable: &str, len: u32) -> CompileResult<i32> {
    self.declare_slot(function, variable, SlotKind::Array(len))
  }

  pub fn declare_reference(&mut self, function: &str, variable: &str) -> CompileResult<i32> {
    self.declare_slot(function, variable, SlotKind::Reference)
  }

  /// Fails with `FrameTooLarge` when the frame governed by the layout would
  /// grow past `MAX_FRAME_SIZE`.
  fn declare_slot(&mut self, function: &str, variable: &str, kind: SlotKind) -> CompileResult<i32> {
    let scope = self.scopes.entry(function.to_string()).or_default();
    if let Some(slot) = scope.slots.get(variable) {
      return Ok(slot.offset);
    }

    let words = match kind {
      SlotKind::Array(len) => len,
      SlotKind::Scalar | SlotKind::Reference => 1,
    };
    let too_large = FrameTooLargeSnafu {
      function,
      limit: MAX_FRAME_SIZE,
    };
    let bytes = i32::try_from(words)
      .ok()
      .and_then(|words| words.checked_mul(WORD_SIZE))
      .context(too_large)?;
    let (offset, end) = match self.layout {
      FrameLayout::PerFunction => (scope.cursor, scope.cursor.checked_add(bytes)),
      FrameLayout::Cumulative => (self.cursor, self.cursor.checked_add(bytes)),
    };
    ensure!(end.is_some_and(|end| end <= MAX_FRAME_SIZE), too_large);

    scope.slots.insert(variable.to_string(), Slot { offset, kind });
    scope.cursor += bytes;
    self.cursor = self.cursor.saturating_add(bytes);
    trace!(function, variable, offset, ?kind, "declare");
    Ok(offset)
  }

  pub fn slot(&self, function: &str, variable: &str) -> CompileResult<Slot> {
    self
      .scopes
      .get(function)
      .and_then(|scope| scope.slots.get(variable))
      .copied()
      .context(UnknownSymbolSnafu {
        function,
        name: variable,
      })
  }

  pub fn offset_of(&self, function: &str, variable: &str) -> CompileResult<i32> {
    Ok(self.slot(function, variable)?.offset)
  }

  pub fn is_declared(&self, function: &str, variable: &str) -> bool {
    self.slot(function, variable).is_ok()
  }

  /// Bytes handed out so far across the whole unit.
  pub fn current_frame_size(&self) -> i32 {
    self.cursor
  }

  /// Bytes `function` must reserve on entry under the configured layout.
  pub fn frame_size(&self, function: &str) -> i32 {
    match self.layout {
      FrameLayout::PerFunction => self.scopes.get(function).map_or(0, |scope| scope.cursor),
      FrameLayout::Cumulative => self.cursor,
    }
  }

  pub fn set_value(&mut self, function: &str, variable: &str, value: i64) {
    self
      .values
      .entry(function.to_string())
      .or_default()
      .insert(variable.to_string(), value);
  }

  pub fn value(&self, function: &str, variable: &str) -> CompileResult<i64> {
    self
      .values
      .get(function)
      .and_then(|values| values.get(variable))
      .copied()
      .context(UnknownSymbolSnafu {
        function,
        name: variable,
      })
  }

  pub fn declare_function(&mut self, name: &str, params: Vec<PassMode>) -> CompileResult<()> {
    ensure!(
      !self.functions.contains_key(name),
      DuplicateFunctionSnafu { name }
    );
    self.functions.insert(name.to_string(), Signature { params });
    Ok(())
  }

  pub fn function(&self, name: &str) -> CompileResult<&Signature> {
    self.functions.get(name).context(UnknownFunctionSnafu { name })
  }
}
