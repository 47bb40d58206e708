//! File handling around the compiler: read the source, compile it and either
//! hand the assembly back or write it to disk.

use std::fs;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, ensure};
use tracing::info;

use crate::config::Options;
use crate::error::{CompileResult, EmptySourceSnafu, ReadSourceSnafu, WriteOutputSnafu};

/// Where the generated assembly ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// No output path was given; the caller prints the assembly.
  Printed(String),
  Written(PathBuf),
}

/// Compile `input`. A missing, unreadable or blank file fails before the
/// parser ever runs, and nothing is written unless compilation succeeds.
pub fn compile_file(
  input: &Path,
  output: Option<&Path>,
  options: &Options,
) -> CompileResult<Outcome> {
  let source = fs::read_to_string(input).context(ReadSourceSnafu { path: input })?;
  ensure!(!source.trim().is_empty(), EmptySourceSnafu { path: input });

  info!(input = %input.display(), bytes = source.len(), "compiling");
  let asm = crate::compile(&source, options)?;

  let Some(output) = output else {
    return Ok(Outcome::Printed(asm));
  };
  fs::write(output, &asm).context(WriteOutputSnafu { path: output })?;
  info!(output = %output.display(), "wrote assembly");
  Ok(Outcome::Written(output.to_path_buf()))
}
