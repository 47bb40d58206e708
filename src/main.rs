use std::path::PathBuf;
use std::process;

use clap::Parser;
use minicc::driver::{self, Outcome};
use minicc::registers::TEMP_REGISTERS;
use minicc::{FrameLayout, Options, ReturnPolicy};
use tracing::Level;

const MAX_REGISTERS: u8 = TEMP_REGISTERS.len() as u8;

/// Compile a MiniC++ source file into MIPS assembly.
#[derive(Parser, Debug)]
#[command(name = "compile", version, about)]
struct Args {
  /// Source file to compile.
  input: PathBuf,

  /// Write the assembly here instead of printing it.
  output: Option<PathBuf>,

  /// Number of temporary registers ($t0 upwards) available to expressions.
  #[arg(
    long,
    default_value_t = MAX_REGISTERS,
    value_parser = clap::value_parser!(u8).range(1..=i64::from(MAX_REGISTERS))
  )]
  registers: u8,

  /// How stack offsets are assigned across functions.
  #[arg(long, value_enum, default_value_t = FrameLayout::PerFunction)]
  frame_layout: FrameLayout,

  /// How function bodies are terminated.
  #[arg(long, value_enum, default_value_t = ReturnPolicy::EntryExits)]
  return_policy: ReturnPolicy,

  /// Function the program starts in.
  #[arg(long, default_value = "main")]
  entry: String,

  /// Log more; repeat for more detail.
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn main() {
  let args = Args::parse();

  let level = match args.verbose {
    0 => Level::WARN,
    1 => Level::INFO,
    2 => Level::DEBUG,
    _ => Level::TRACE,
  };
  tracing_subscriber::fmt()
    .with_target(false)
    .with_max_level(level)
    .with_writer(std::io::stderr)
    .init();

  let options = Options {
    registers: usize::from(args.registers),
    frame_layout: args.frame_layout,
    return_policy: args.return_policy,
    entry: args.entry,
  };

  match driver::compile_file(&args.input, args.output.as_deref(), &options) {
    Ok(Outcome::Printed(asm)) => {
      println!("Compilation successful");
      print!("{asm}");
    }
    Ok(Outcome::Written(path)) => println!("Wrote {}", path.display()),
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  }
}
