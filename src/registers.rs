//! Bounded pool of temporary registers.
//!
//! Allocation always hands out the first free register in declaration order,
//! so the same program compiles to the same register assignment every time.
//! There is no spilling: running out of registers is an error.

use std::fmt;

use snafu::ensure;
use tracing::trace;

use crate::error::{
  CompileResult, DoubleFreeSnafu, ForeignRegisterSnafu, InvalidRegisterCountSnafu,
  RegistersExhaustedSnafu,
};

/// Every temporary register the target offers, in allocation order.
pub const TEMP_REGISTERS: [&str; 10] = [
  "$t0", "$t1", "$t2", "$t3", "$t4", "$t5", "$t6", "$t7", "$t8", "$t9",
];

/// Name of a machine register holding an intermediate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(&'static str);

impl Register {
  pub const fn named(name: &'static str) -> Self {
    Self(name)
  }

  pub fn name(self) -> &'static str {
    self.0
  }
}

impl fmt::Display for Register {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.0)
  }
}

#[derive(Debug, Clone)]
pub struct RegisterPool {
  names: Vec<&'static str>,
  used: Vec<bool>,
}

impl Default for RegisterPool {
  fn default() -> Self {
    Self {
      names: TEMP_REGISTERS.to_vec(),
      used: vec![false; TEMP_REGISTERS.len()],
    }
  }
}

impl RegisterPool {
  /// A pool over the first `capacity` temporaries.
  pub fn with_capacity(capacity: usize) -> CompileResult<Self> {
    ensure!(
      (1..=TEMP_REGISTERS.len()).contains(&capacity),
      InvalidRegisterCountSnafu {
        requested: capacity,
        max: TEMP_REGISTERS.len(),
      }
    );
    Ok(Self {
      names: TEMP_REGISTERS[..capacity].to_vec(),
      used: vec![false; capacity],
    })
  }

  pub fn capacity(&self) -> usize {
    self.names.len()
  }

  pub fn allocate(&mut self) -> CompileResult<Register> {
    let Some(index) = self.used.iter().position(|used| !used) else {
      return RegistersExhaustedSnafu {
        capacity: self.capacity(),
      }
      .fail();
    };
    self.used[index] = true;
    trace!(register = self.names[index], "allocate");
    Ok(Register(self.names[index]))
  }

  pub fn free(&mut self, register: Register) -> CompileResult<()> {
    let Some(index) = self.names.iter().position(|name| *name == register.0) else {
      return ForeignRegisterSnafu {
        register: register.0,
      }
      .fail();
    };
    ensure!(
      self.used[index],
      DoubleFreeSnafu {
        register: register.0
      }
    );
    self.used[index] = false;
    trace!(register = register.0, "free");
    Ok(())
  }

  /// Registers currently holding live values, in pool order.
  pub fn in_use(&self) -> Vec<Register> {
    self
      .names
      .iter()
      .zip(&self.used)
      .filter(|(_, used)| **used)
      .map(|(name, _)| Register(*name))
      .collect()
  }

  pub fn is_idle(&self) -> bool {
    self.used.iter().all(|used| !used)
  }
}
