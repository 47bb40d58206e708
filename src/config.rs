//! Compilation options shared by the library and the command-line driver.

use clap::ValueEnum;

use crate::registers::TEMP_REGISTERS;

/// How stack offsets are handed out across functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FrameLayout {
  /// Every function starts its own cursor at 0 and reserves only its own slots.
  #[default]
  PerFunction,
  /// One cursor shared by the whole unit; every function reserves the space
  /// of all variables in the unit.
  Cumulative,
}

/// How a function body is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReturnPolicy {
  /// The entry function ends with the exit system call, all others with `jr $ra`.
  #[default]
  EntryExits,
  /// Every function ends with `jr $ra`.
  Always,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
  /// Number of temporary registers available to expressions.
  pub registers: usize,
  pub frame_layout: FrameLayout,
  pub return_policy: ReturnPolicy,
  /// Function the program header jumps to.
  pub entry: String,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      registers: TEMP_REGISTERS.len(),
      frame_layout: FrameLayout::default(),
      return_policy: ReturnPolicy::default(),
      entry: "main".to_string(),
    }
  }
}
