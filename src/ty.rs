//! The type marker. The language has a single word-sized integer type; the
//! marker exists so declarations and signatures carry it explicitly.

/// Size in bytes of one stack slot.
pub const WORD_SIZE: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
  Int,
}

/// How an argument reaches a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
  Value,
  Reference,
}
