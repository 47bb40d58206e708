//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` performs lexical analysis and produces a lazy token stream.
//! - `parser` owns all syntactic knowledge, fills the symbol table and
//!   returns the syntax tree defined in `ast`.
//! - `codegen` lowers the tree into MIPS assembly, drawing temporaries from
//!   `registers` and stack offsets from `symbols`.
//! - `session` bundles the mutable state of one compilation unit.
//! - `driver` handles the file side for the `compile` binary.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod driver;
pub mod error;
pub mod parser;
pub mod registers;
pub mod session;
pub mod symbols;
pub mod tokenizer;
pub mod ty;

pub use config::{FrameLayout, Options, ReturnPolicy};
pub use error::{CompileError, CompileResult};
pub use session::Session;

/// Compile a source string into MIPS assembly with the default options.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  compile(source, &Options::default())
}

/// Compile a source string in a fresh session.
pub fn compile(source: &str, options: &Options) -> CompileResult<String> {
  Session::new(options.clone())?.compile(source)
}
