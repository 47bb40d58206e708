//! Code generation: lower the syntax tree into MIPS assembly.
//!
//! Every node implements [`Emit`]. An expression leaves its value in a
//! temporary taken from the session's register pool and hands ownership of
//! that register to its parent, which frees it once consumed. Variables live
//! in the function's stack frame and are addressed relative to `$sp`.
//!
//! Directives and labels start at column 0; instructions are indented four
//! spaces, one per line.

use snafu::ensure;
use tracing::debug;

use crate::ast::{BinaryOp, Call, Epilogue, Expr, Function, PrintArg, Program, Stmt};
use crate::error::{
  ArgumentCountSnafu, CompileResult, FrameTooLargeSnafu, MissingEntrySnafu,
  ReferenceArgumentSnafu, SlotKindSnafu,
};
use crate::registers::Register;
use crate::session::Session;
use crate::symbols::{MAX_FRAME_SIZE, RETURN_ADDRESS, SlotKind};
use crate::ty::{PassMode, WORD_SIZE};

/// Arguments passed in `$a0..$a3`; the rest go through the outgoing area.
const ARG_REGISTERS: usize = 4;

/// Prefixes of the branch labels synthesized for `if` and `while`.
const LABEL_PREFIXES: [&str; 4] = ["else_", "end_if_", "while_start_", "while_end_"];

/// Whether `name` has the shape of a synthesized branch label, so it cannot
/// also name a function.
pub fn is_reserved_label(name: &str) -> bool {
  LABEL_PREFIXES.iter().any(|prefix| {
    name
      .strip_prefix(prefix)
      .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
  })
}

/// Generated code plus the register holding the node's value, if it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodePlace {
  pub code: String,
  pub place: Option<Register>,
}

impl CodePlace {
  fn code(code: String) -> Self {
    Self { code, place: None }
  }

  fn value(code: String, place: Register) -> Self {
    Self {
      code,
      place: Some(place),
    }
  }
}

pub trait Emit {
  /// Generate code for this node. A returned `place` is owned by the caller,
  /// which must free it.
  fn emit(&self, session: &mut Session) -> CompileResult<CodePlace>;
}

fn ins(code: &mut String, text: &str) {
  code.push_str("    ");
  code.push_str(text);
  code.push('\n');
}

fn label(code: &mut String, name: &str) {
  code.push_str(name);
  code.push_str(":\n");
}

fn words(count: usize) -> i32 {
  count as i32 * WORD_SIZE
}

impl Emit for Program {
  fn emit(&self, s: &mut Session) -> CompileResult<CodePlace> {
    ensure!(
      s.symbols.function(&self.entry).is_ok(),
      MissingEntrySnafu { name: &self.entry }
    );
    let mut code = String::from(".text\n");
    ins(&mut code, &format!("jal {}", self.entry));
    // Whatever the entry's epilogue, control must not fall into the first
    // function once it returns.
    ins(&mut code, "li $v0, 10");
    ins(&mut code, "syscall");
    for function in &self.functions {
      code.push_str(&function.emit(s)?.code);
    }
    Ok(CodePlace::code(code))
  }
}

impl Emit for Function {
  fn emit(&self, s: &mut Session) -> CompileResult<CodePlace> {
    s.enter_function(&self.name);
    let frame = s.symbols.frame_size(&self.name);

    let mut code = String::new();
    label(&mut code, &self.name);
    if frame > 0 {
      ins(&mut code, &format!("addi $sp, $sp, -{frame}"));
    }
    let ra_offset = if self.makes_calls {
      let offset = s.symbols.offset_of(&self.name, RETURN_ADDRESS)?;
      ins(&mut code, &format!("sw $ra, {offset}($sp)"));
      Some(offset)
    } else {
      None
    };

    for (i, param) in self.params.iter().enumerate() {
      let offset = s.symbols.offset_of(&self.name, &param.name)?;
      if i < ARG_REGISTERS {
        ins(&mut code, &format!("sw $a{i}, {offset}($sp)"));
      } else {
        // The caller left it just above our frame.
        let incoming = frame + words(i - ARG_REGISTERS);
        ensure!(
          incoming <= MAX_FRAME_SIZE,
          FrameTooLargeSnafu {
            function: &self.name,
            limit: MAX_FRAME_SIZE,
          }
        );
        let reg = s.registers.allocate()?;
        ins(&mut code, &format!("lw {reg}, {incoming}($sp)"));
        ins(&mut code, &format!("sw {reg}, {offset}($sp)"));
        s.registers.free(reg)?;
      }
    }

    for stmt in &self.body {
      code.push_str(&stmt.emit(s)?.code);
    }

    if let Some(offset) = ra_offset {
      ins(&mut code, &format!("lw $ra, {offset}($sp)"));
    }
    if frame > 0 {
      ins(&mut code, &format!("addi $sp, $sp, {frame}"));
    }
    match self.epilogue {
      Epilogue::Return => ins(&mut code, "jr $ra"),
      Epilogue::Exit => {
        ins(&mut code, "li $v0, 10");
        ins(&mut code, "syscall");
      }
    }

    debug!(function = %self.name, frame, "generated function");
    Ok(CodePlace::code(code))
  }
}

impl Emit for Stmt {
  fn emit(&self, s: &mut Session) -> CompileResult<CodePlace> {
    let mut code = String::new();
    match self {
      Stmt::Assign { name, value } => {
        let slot = s.slot(name)?;
        if let SlotKind::Array(_) = slot.kind {
          return not_a(s, name, "a scalar variable");
        }
        let (value_code, val) = value.emit_value(s)?;
        code.push_str(&value_code);
        store(&mut code, s, val, slot.offset, slot.kind)?;
        s.registers.free(val)?;
      }
      Stmt::IndexAssign { name, index, value } => {
        let (addr_code, addr) = element_address(s, name, index)?;
        code.push_str(&addr_code);
        let (value_code, val) = value.emit_value(s)?;
        code.push_str(&value_code);
        ins(&mut code, &format!("sw {val}, 0({addr})"));
        s.registers.free(val)?;
        s.registers.free(addr)?;
      }
      Stmt::Call(call) => {
        let (call_code, result) = call.emit_value(s)?;
        code.push_str(&call_code);
        s.registers.free(result)?;
      }
      Stmt::Print(args) => {
        for arg in args {
          code.push_str(&arg.emit(s)?.code);
        }
      }
      Stmt::Input { name, index } => match index {
        Some(index) => {
          let (addr_code, addr) = element_address(s, name, index)?;
          code.push_str(&addr_code);
          read_int(&mut code);
          ins(&mut code, &format!("sw $v0, 0({addr})"));
          s.registers.free(addr)?;
        }
        None => {
          let slot = s.slot(name)?;
          if let SlotKind::Array(_) = slot.kind {
            return not_a(s, name, "a scalar variable");
          }
          read_int(&mut code);
          store(&mut code, s, Register::named("$v0"), slot.offset, slot.kind)?;
        }
      },
      Stmt::If {
        cond,
        then_body,
        else_body,
      } => {
        let (cond_code, c) = cond.emit_value(s)?;
        code.push_str(&cond_code);
        let n = s.next_if_label();
        ins(&mut code, &format!("beqz {c}, else_{n}"));
        s.registers.free(c)?;
        for stmt in then_body {
          code.push_str(&stmt.emit(s)?.code);
        }
        ins(&mut code, &format!("j end_if_{n}"));
        label(&mut code, &format!("else_{n}"));
        for stmt in else_body.iter().flatten() {
          code.push_str(&stmt.emit(s)?.code);
        }
        label(&mut code, &format!("end_if_{n}"));
      }
      Stmt::While { cond, body } => {
        let n = s.next_while_label();
        label(&mut code, &format!("while_start_{n}"));
        let (cond_code, c) = cond.emit_value(s)?;
        code.push_str(&cond_code);
        ins(&mut code, &format!("beqz {c}, while_end_{n}"));
        s.registers.free(c)?;
        for stmt in body {
          code.push_str(&stmt.emit(s)?.code);
        }
        ins(&mut code, &format!("j while_start_{n}"));
        label(&mut code, &format!("while_end_{n}"));
      }
    }
    Ok(CodePlace::code(code))
  }
}

impl Emit for PrintArg {
  fn emit(&self, s: &mut Session) -> CompileResult<CodePlace> {
    let mut code = String::new();
    match self {
      PrintArg::Expr(expr) => {
        let (value_code, reg) = expr.emit_value(s)?;
        code.push_str(&value_code);
        ins(&mut code, &format!("move $a0, {reg}"));
        ins(&mut code, "li $v0, 1");
        ins(&mut code, "syscall");
        s.registers.free(reg)?;
      }
      // The print-character call writes one byte, so text goes out as UTF-8.
      PrintArg::Str(raw) => {
        for byte in decode_string(raw).bytes() {
          print_byte(&mut code, byte);
        }
      }
      PrintArg::Endl => print_byte(&mut code, b'\n'),
    }
    Ok(CodePlace::code(code))
  }
}

impl Emit for Expr {
  fn emit(&self, s: &mut Session) -> CompileResult<CodePlace> {
    let (code, reg) = self.emit_value(s)?;
    Ok(CodePlace::value(code, reg))
  }
}

impl Emit for Call {
  fn emit(&self, s: &mut Session) -> CompileResult<CodePlace> {
    let (code, reg) = self.emit_value(s)?;
    Ok(CodePlace::value(code, reg))
  }
}

impl Expr {
  fn emit_value(&self, s: &mut Session) -> CompileResult<(String, Register)> {
    let mut code = String::new();
    let reg = match self {
      Expr::Number(value) => {
        let reg = s.registers.allocate()?;
        ins(&mut code, &format!("li {reg}, {value}"));
        reg
      }
      Expr::Var(name) => {
        let slot = s.slot(name)?;
        match slot.kind {
          SlotKind::Scalar => {
            let reg = s.registers.allocate()?;
            ins(&mut code, &format!("lw {reg}, {}($sp)", slot.offset));
            reg
          }
          SlotKind::Reference => {
            let reg = s.registers.allocate()?;
            ins(&mut code, &format!("lw {reg}, {}($sp)", slot.offset));
            ins(&mut code, &format!("lw {reg}, 0({reg})"));
            reg
          }
          SlotKind::Array(_) => return not_a(s, name, "a scalar variable"),
        }
      }
      Expr::Index { name, index } => {
        let (addr_code, reg) = element_address(s, name, index)?;
        code.push_str(&addr_code);
        ins(&mut code, &format!("lw {reg}, 0({reg})"));
        reg
      }
      Expr::Binary { op, lhs, rhs } => {
        let (lhs_code, l) = lhs.emit_value(s)?;
        let (rhs_code, r) = rhs.emit_value(s)?;
        code.push_str(&lhs_code);
        code.push_str(&rhs_code);
        let res = s.registers.allocate()?;
        binary(&mut code, *op, res, l, r);
        s.registers.free(l)?;
        s.registers.free(r)?;
        res
      }
      Expr::Call(call) => {
        let (call_code, reg) = call.emit_value(s)?;
        code.push_str(&call_code);
        reg
      }
    };
    Ok((code, reg))
  }
}

fn binary(code: &mut String, op: BinaryOp, res: Register, l: Register, r: Register) {
  match op {
    BinaryOp::Add => ins(code, &format!("add {res}, {l}, {r}")),
    BinaryOp::Sub => ins(code, &format!("sub {res}, {l}, {r}")),
    BinaryOp::Mul => {
      ins(code, &format!("mult {l}, {r}"));
      ins(code, &format!("mflo {res}"));
    }
    BinaryOp::Div => {
      ins(code, &format!("div {l}, {r}"));
      ins(code, &format!("mflo {res}"));
    }
    BinaryOp::Mod => {
      ins(code, &format!("div {l}, {r}"));
      ins(code, &format!("mfhi {res}"));
    }
    BinaryOp::Lt => ins(code, &format!("slt {res}, {l}, {r}")),
    BinaryOp::Gt => ins(code, &format!("slt {res}, {r}, {l}")),
    BinaryOp::Ge => {
      ins(code, &format!("slt {res}, {l}, {r}"));
      ins(code, &format!("xori {res}, {res}, 1"));
    }
    BinaryOp::Le => {
      ins(code, &format!("slt {res}, {r}, {l}"));
      ins(code, &format!("xori {res}, {res}, 1"));
    }
    BinaryOp::Eq => {
      ins(code, &format!("xor {res}, {l}, {r}"));
      ins(code, &format!("sltiu {res}, {res}, 1"));
    }
    BinaryOp::Ne => {
      ins(code, &format!("xor {res}, {l}, {r}"));
      ins(code, &format!("sltu {res}, $zero, {res}"));
    }
    // Both operands are already evaluated; no short circuit.
    BinaryOp::And => {
      ins(code, &format!("sltu {l}, $zero, {l}"));
      ins(code, &format!("sltu {r}, $zero, {r}"));
      ins(code, &format!("and {res}, {l}, {r}"));
    }
    BinaryOp::Or => {
      ins(code, &format!("or {res}, {l}, {r}"));
      ins(code, &format!("sltu {res}, $zero, {res}"));
    }
  }
}

impl Call {
  fn emit_value(&self, s: &mut Session) -> CompileResult<(String, Register)> {
    let params = s.symbols.function(&self.callee)?.params.clone();
    ensure!(
      params.len() == self.args.len(),
      ArgumentCountSnafu {
        function: &self.callee,
        expected: params.len(),
        found: self.args.len(),
      }
    );

    let mut code = String::new();
    let mut args = Vec::with_capacity(self.args.len());
    for (i, (arg, mode)) in self.args.iter().zip(&params).enumerate() {
      let (arg_code, reg) = match mode {
        PassMode::Value => arg.emit_value(s)?,
        PassMode::Reference => address_of(s, arg, &self.callee, i + 1)?,
      };
      code.push_str(&arg_code);
      args.push(reg);
    }

    // Temporaries of enclosing expressions do not survive the callee.
    let live: Vec<Register> = s
      .registers
      .in_use()
      .into_iter()
      .filter(|reg| !args.contains(reg))
      .collect();
    if !live.is_empty() {
      ins(&mut code, &format!("addi $sp, $sp, -{}", words(live.len())));
      for (j, reg) in live.iter().enumerate() {
        ins(&mut code, &format!("sw {reg}, {}($sp)", words(j)));
      }
    }

    let extra = args.len().saturating_sub(ARG_REGISTERS);
    if extra > 0 {
      ins(&mut code, &format!("addi $sp, $sp, -{}", words(extra)));
      for (i, reg) in args.iter().enumerate().skip(ARG_REGISTERS) {
        ins(&mut code, &format!("sw {reg}, {}($sp)", words(i - ARG_REGISTERS)));
      }
    }
    for (i, reg) in args.iter().take(ARG_REGISTERS).enumerate() {
      ins(&mut code, &format!("move $a{i}, {reg}"));
    }
    for reg in args {
      s.registers.free(reg)?;
    }

    ins(&mut code, &format!("jal {}", self.callee));

    if extra > 0 {
      ins(&mut code, &format!("addi $sp, $sp, {}", words(extra)));
    }
    if !live.is_empty() {
      for (j, reg) in live.iter().enumerate() {
        ins(&mut code, &format!("lw {reg}, {}($sp)", words(j)));
      }
      ins(&mut code, &format!("addi $sp, $sp, {}", words(live.len())));
    }

    let result = s.registers.allocate()?;
    ins(&mut code, &format!("move {result}, $v0"));
    Ok((code, result))
  }
}

/// Address of the variable an argument names, for by-reference parameters.
fn address_of(
  s: &mut Session,
  arg: &Expr,
  callee: &str,
  position: usize,
) -> CompileResult<(String, Register)> {
  let mut code = String::new();
  match arg {
    Expr::Var(name) => {
      let slot = s.slot(name)?;
      let reg = match slot.kind {
        SlotKind::Scalar => {
          let reg = s.registers.allocate()?;
          ins(&mut code, &format!("addi {reg}, $sp, {}", slot.offset));
          reg
        }
        // Already an address: pass it along.
        SlotKind::Reference => {
          let reg = s.registers.allocate()?;
          ins(&mut code, &format!("lw {reg}, {}($sp)", slot.offset));
          reg
        }
        SlotKind::Array(_) => return not_a(s, name, "a scalar variable"),
      };
      Ok((code, reg))
    }
    Expr::Index { name, index } => element_address(s, name, index),
    _ => ReferenceArgumentSnafu {
      function: callee,
      position,
    }
    .fail(),
  }
}

/// Compute `$sp + base + index * 4` into a pool register.
fn element_address(s: &mut Session, name: &str, index: &Expr) -> CompileResult<(String, Register)> {
  let slot = s.slot(name)?;
  let SlotKind::Array(_) = slot.kind else {
    return not_a(s, name, "an array");
  };
  let (mut code, reg) = index.emit_value(s)?;
  ins(&mut code, &format!("sll {reg}, {reg}, 2"));
  ins(&mut code, &format!("addi {reg}, {reg}, {}", slot.offset));
  ins(&mut code, &format!("add {reg}, {reg}, $sp"));
  Ok((code, reg))
}

/// Store `value` into a scalar slot, or through the address a reference
/// slot holds.
fn store(
  code: &mut String,
  s: &mut Session,
  value: Register,
  offset: i32,
  kind: SlotKind,
) -> CompileResult<()> {
  if kind == SlotKind::Reference {
    let addr = s.registers.allocate()?;
    ins(code, &format!("lw {addr}, {offset}($sp)"));
    ins(code, &format!("sw {value}, 0({addr})"));
    s.registers.free(addr)?;
  } else {
    ins(code, &format!("sw {value}, {offset}($sp)"));
  }
  Ok(())
}

fn not_a<T>(s: &Session, name: &str, expected: &'static str) -> CompileResult<T> {
  SlotKindSnafu {
    function: s.function(),
    name,
    expected,
  }
  .fail()
}

fn read_int(code: &mut String) {
  ins(code, "li $v0, 5");
  ins(code, "syscall");
}

fn print_byte(code: &mut String, byte: u8) {
  ins(code, &format!("li $a0, {byte}"));
  ins(code, "li $v0, 11");
  ins(code, "syscall");
}

/// Strip the quotes of a raw literal and resolve its escape sequences. An
/// unknown escape stands for the escaped character itself.
fn decode_string(raw: &str) -> String {
  let inner = raw
    .strip_prefix('"')
    .and_then(|rest| rest.strip_suffix('"'))
    .unwrap_or(raw);
  let mut out = String::with_capacity(inner.len());
  let mut chars = inner.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('n') => out.push('\n'),
      Some('t') => out.push('\t'),
      Some('0') => out.push('\0'),
      Some(other) => out.push(other),
      None => out.push('\\'),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Options;
  use crate::error::CompileError;

  fn session() -> Session {
    let mut s = Session::new(Options::default()).unwrap();
    s.symbols.declare("main", "x").unwrap();
    s.symbols.declare("main", "y").unwrap();
    s.symbols.declare_array("main", "v", 4).unwrap();
    s.enter_function("main");
    s
  }

  fn lines(code: &str) -> Vec<&str> {
    code.lines().map(str::trim).collect()
  }

  #[test]
  fn binary_allocates_result_after_operands() {
    let mut s = session();
    let expr = Expr::binary(BinaryOp::Add, Expr::Number(1), Expr::Number(2));
    let out = expr.emit(&mut s).unwrap();
    assert_eq!(
      lines(&out.code),
      ["li $t0, 1", "li $t1, 2", "add $t2, $t0, $t1"]
    );
    assert_eq!(out.place, Some(Register::named("$t2")));
    assert_eq!(s.registers.in_use(), vec![Register::named("$t2")]);
  }

  #[test]
  fn expression_leaves_exactly_one_register_live() {
    let mut s = session();
    let expr = Expr::binary(
      BinaryOp::Or,
      Expr::binary(BinaryOp::Le, Expr::Var("x".into()), Expr::Number(3)),
      Expr::binary(
        BinaryOp::Mod,
        Expr::index("v", Expr::Var("y".into())),
        Expr::Number(2),
      ),
    );
    let out = expr.emit(&mut s).unwrap();
    let place = out.place.unwrap();
    assert_eq!(s.registers.in_use(), vec![place]);
    s.registers.free(place).unwrap();
    assert!(s.registers.is_idle());
  }

  #[test]
  fn operator_templates() {
    let cases: [(BinaryOp, &[&str]); 13] = [
      (BinaryOp::Add, &["add $t2, $t0, $t1"]),
      (BinaryOp::Sub, &["sub $t2, $t0, $t1"]),
      (BinaryOp::Mul, &["mult $t0, $t1", "mflo $t2"]),
      (BinaryOp::Div, &["div $t0, $t1", "mflo $t2"]),
      (BinaryOp::Mod, &["div $t0, $t1", "mfhi $t2"]),
      (BinaryOp::Lt, &["slt $t2, $t0, $t1"]),
      (BinaryOp::Gt, &["slt $t2, $t1, $t0"]),
      (BinaryOp::Ge, &["slt $t2, $t0, $t1", "xori $t2, $t2, 1"]),
      (BinaryOp::Le, &["slt $t2, $t1, $t0", "xori $t2, $t2, 1"]),
      (BinaryOp::Eq, &["xor $t2, $t0, $t1", "sltiu $t2, $t2, 1"]),
      (BinaryOp::Ne, &["xor $t2, $t0, $t1", "sltu $t2, $zero, $t2"]),
      (
        BinaryOp::And,
        &["sltu $t0, $zero, $t0", "sltu $t1, $zero, $t1", "and $t2, $t0, $t1"],
      ),
      (BinaryOp::Or, &["or $t2, $t0, $t1", "sltu $t2, $zero, $t2"]),
    ];
    for (op, template) in cases {
      let mut s = session();
      let out = Expr::binary(op, Expr::Number(1), Expr::Number(2))
        .emit(&mut s)
        .unwrap();
      let code = lines(&out.code);
      assert_eq!(code[..2], ["li $t0, 1", "li $t1, 2"], "{op:?}");
      assert_eq!(code[2..], *template, "{op:?}");
      assert_eq!(out.place, Some(Register::named("$t2")));
    }
  }

  #[test]
  fn array_read_addresses_from_its_own_offset() {
    let mut s = session();
    let out = Expr::index("v", Expr::Number(1)).emit(&mut s).unwrap();
    assert_eq!(
      lines(&out.code),
      [
        "li $t0, 1",
        "sll $t0, $t0, 2",
        "addi $t0, $t0, 8",
        "add $t0, $t0, $sp",
        "lw $t0, 0($t0)",
      ]
    );
  }

  #[test]
  fn indexing_a_scalar_is_rejected() {
    let mut s = session();
    let err = Expr::index("x", Expr::Number(0)).emit(&mut s).unwrap_err();
    assert!(matches!(err, CompileError::SlotKind { expected: "an array", .. }));
  }

  #[test]
  fn reading_an_undeclared_variable_fails() {
    let mut s = session();
    let err = Expr::Var("nope".into()).emit(&mut s).unwrap_err();
    assert!(matches!(err, CompileError::UnknownSymbol { .. }));
  }

  #[test]
  fn nesting_deeper_than_the_pool_is_exhaustion() {
    let mut s = Session::new(Options {
      registers: 2,
      ..Options::default()
    })
    .unwrap();
    let expr = Expr::binary(BinaryOp::Add, Expr::Number(1), Expr::Number(2));
    assert!(matches!(
      expr.emit(&mut s),
      Err(CompileError::RegistersExhausted { capacity: 2 })
    ));
  }

  #[test]
  fn if_labels_are_paired_and_unique() {
    let mut s = session();
    let stmt = Stmt::If {
      cond: Expr::Var("x".into()),
      then_body: vec![],
      else_body: None,
    };
    let first = stmt.emit(&mut s).unwrap().code;
    let second = stmt.emit(&mut s).unwrap().code;
    assert!(first.contains("beqz $t0, else_0"));
    assert!(first.contains("j end_if_0"));
    assert!(second.contains("beqz $t0, else_1"));
    assert!(second.contains("end_if_1:"));
    assert!(s.registers.is_idle());
  }

  #[test]
  fn strings_print_one_character_at_a_time() {
    let mut s = session();
    let out = PrintArg::Str(r#""a\n""#.into()).emit(&mut s).unwrap();
    assert_eq!(
      lines(&out.code),
      [
        "li $a0, 97",
        "li $v0, 11",
        "syscall",
        "li $a0, 10",
        "li $v0, 11",
        "syscall",
      ]
    );
  }

  #[test]
  fn non_ascii_text_prints_its_utf8_bytes() {
    let mut s = session();
    let out = PrintArg::Str("\"é\"".into()).emit(&mut s).unwrap();
    let values: Vec<&str> = lines(&out.code)
      .into_iter()
      .filter(|line| line.starts_with("li $a0"))
      .collect();
    assert_eq!(values, ["li $a0, 195", "li $a0, 169"]);
  }

  #[test]
  fn branch_label_shapes_are_reserved() {
    assert!(is_reserved_label("else_0"));
    assert!(is_reserved_label("end_if_12"));
    assert!(is_reserved_label("while_start_3"));
    assert!(is_reserved_label("while_end_0"));
    assert!(!is_reserved_label("while_end"));
    assert!(!is_reserved_label("else_x"));
    assert!(!is_reserved_label("main"));
  }

  #[test]
  fn escapes_are_decoded() {
    assert_eq!(decode_string(r#""a\tb\\c\"d""#), "a\tb\\c\"d");
    assert_eq!(decode_string(r#""""#), "");
  }

  #[test]
  fn call_saves_live_temporaries() {
    let mut s = session();
    s.symbols.declare_function("f", vec![PassMode::Value]).unwrap();
    let expr = Expr::binary(
      BinaryOp::Add,
      Expr::Number(7),
      Expr::Call(Call {
        callee: "f".into(),
        args: vec![Expr::Number(1)],
      }),
    );
    let out = expr.emit(&mut s).unwrap();
    assert_eq!(
      lines(&out.code),
      [
        "li $t0, 7",
        "li $t1, 1",
        "addi $sp, $sp, -4",
        "sw $t0, 0($sp)",
        "move $a0, $t1",
        "jal f",
        "lw $t0, 0($sp)",
        "addi $sp, $sp, 4",
        "move $t1, $v0",
        "add $t2, $t0, $t1",
      ]
    );
  }

  #[test]
  fn extra_arguments_use_the_outgoing_area() {
    let mut s = session();
    s.symbols
      .declare_function("f", vec![PassMode::Value; 5])
      .unwrap();
    let call = Call {
      callee: "f".into(),
      args: (1..=5).map(Expr::Number).collect(),
    };
    let out = call.emit(&mut s).unwrap();
    let code = lines(&out.code);
    assert!(code.contains(&"addi $sp, $sp, -4"));
    assert!(code.contains(&"sw $t4, 0($sp)"));
    assert!(code.contains(&"move $a3, $t3"));
    assert!(code.contains(&"addi $sp, $sp, 4"));
    assert_eq!(out.place, Some(Register::named("$t0")));
  }

  #[test]
  fn reference_arguments_pass_addresses() {
    let mut s = session();
    s.symbols
      .declare_function("swap", vec![PassMode::Reference, PassMode::Reference])
      .unwrap();
    let call = Call {
      callee: "swap".into(),
      args: vec![Expr::Var("y".into()), Expr::index("v", Expr::Number(2))],
    };
    let code = call.emit(&mut s).unwrap().code;
    assert!(code.contains("addi $t0, $sp, 4"));
    assert!(code.contains("move $a1, $t1"));

    let bad = Call {
      callee: "swap".into(),
      args: vec![Expr::Number(1), Expr::Var("x".into())],
    };
    assert!(matches!(
      bad.emit(&mut s),
      Err(CompileError::ReferenceArgument { position: 1, .. })
    ));
  }

  #[test]
  fn argument_count_is_checked() {
    let mut s = session();
    s.symbols.declare_function("f", vec![]).unwrap();
    let call = Call {
      callee: "f".into(),
      args: vec![Expr::Number(1)],
    };
    assert!(matches!(
      call.emit(&mut s),
      Err(CompileError::ArgumentCount {
        expected: 0,
        found: 1,
        ..
      })
    ));
  }
}
