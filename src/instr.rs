//! Three-address instruction model for ASL
//!
//! CodeGenPass emits [`Instruction`]s into per-function [`Subroutine`]s; a
//! [`Listing`] assembles the whole program. This layer does no
//! interpretation of operands — it only names opcodes and formats them, the
//! same "opcode plus operand strings" shape the teacher's codegen module
//! assembles IR text with (`codegen/program.rs`'s `writeln!`-based
//! assembly).

use std::fmt;

/// Every opcode ASL code generation can emit (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    FAdd,
    FSub,
    FMul,
    FDiv,
    Float,
    And,
    Or,
    Not,
    Eq,
    Lt,
    Le,
    Load,
    ILoad,
    FLoad,
    ChLoad,
    LoadX,
    XLoad,
    ALoad,
    ReadI,
    ReadF,
    ReadC,
    WriteI,
    WriteF,
    WriteC,
    WriteLn,
    Label,
    UJump,
    FJump,
    Call,
    Return,
    Push,
    Pop,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::FAdd => "FADD",
            Opcode::FSub => "FSUB",
            Opcode::FMul => "FMUL",
            Opcode::FDiv => "FDIV",
            Opcode::Float => "FLOAT",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Eq => "EQ",
            Opcode::Lt => "LT",
            Opcode::Le => "LE",
            Opcode::Load => "LOAD",
            Opcode::ILoad => "ILOAD",
            Opcode::FLoad => "FLOAD",
            Opcode::ChLoad => "CHLOAD",
            Opcode::LoadX => "LOADX",
            Opcode::XLoad => "XLOAD",
            Opcode::ALoad => "ALOAD",
            Opcode::ReadI => "READI",
            Opcode::ReadF => "READF",
            Opcode::ReadC => "READC",
            Opcode::WriteI => "WRITEI",
            Opcode::WriteF => "WRITEF",
            Opcode::WriteC => "WRITEC",
            Opcode::WriteLn => "WRITELN",
            Opcode::Label => "LABEL",
            Opcode::UJump => "UJUMP",
            Opcode::FJump => "FJUMP",
            Opcode::Call => "CALL",
            Opcode::Return => "RETURN",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
        };
        write!(f, "{text}")
    }
}

/// One three-address instruction: an opcode plus whitespace-separated
/// operand strings, in emission order (destination first where there is
/// one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub operands: Vec<String>,
}

impl Instruction {
    pub fn new(op: Opcode, operands: Vec<String>) -> Self {
        Instruction { op, operands }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Instruction::new(Opcode::Label, vec![name.into()])
    }

    pub fn ujump(target: impl Into<String>) -> Self {
        Instruction::new(Opcode::UJump, vec![target.into()])
    }

    pub fn fjump(cond: impl Into<String>, target: impl Into<String>) -> Self {
        Instruction::new(Opcode::FJump, vec![cond.into(), target.into()])
    }

    pub fn call(name: impl Into<String>) -> Self {
        Instruction::new(Opcode::Call, vec![name.into()])
    }

    pub fn ret() -> Self {
        Instruction::new(Opcode::Return, vec![])
    }

    /// `PUSH(src)`.
    pub fn push(src: impl Into<String>) -> Self {
        Instruction::new(Opcode::Push, vec![src.into()])
    }

    /// `PUSH()` — reserves a slot without naming a source, used for the
    /// hidden return-value placeholder ahead of a non-void call (§4.7).
    pub fn push_reserve() -> Self {
        Instruction::new(Opcode::Push, vec![])
    }

    /// `POP(dst)`.
    pub fn pop(dst: impl Into<String>) -> Self {
        Instruction::new(Opcode::Pop, vec![dst.into()])
    }

    /// `POP()` — discards a slot, used to unwind pushed call arguments.
    pub fn pop_discard() -> Self {
        Instruction::new(Opcode::Pop, vec![])
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            write!(f, "{}", self.op)
        } else {
            write!(f, "{} {}", self.op, self.operands.join(","))
        }
    }
}

/// Per-function state for minting fresh temporaries and labels. Resets at
/// the start of each function's code generation (§4.4, §5).
#[derive(Debug, Default)]
pub struct Counters {
    temp: u32,
    if_count: u32,
    while_count: u32,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints the next `%N` temporary name.
    pub fn fresh_temp(&mut self) -> String {
        let name = format!("%{}", self.temp);
        self.temp += 1;
        name
    }

    /// Mints the next `if_N` label base; callers derive `endif_N`/`else_N`
    /// from the same `N`.
    pub fn fresh_if(&mut self) -> u32 {
        let n = self.if_count;
        self.if_count += 1;
        n
    }

    /// Mints the next `while_N` label base; callers derive
    /// `startwhile_N`/`endwhile_N` from the same `N`.
    pub fn fresh_while(&mut self) -> u32 {
        let n = self.while_count;
        self.while_count += 1;
        n
    }
}

pub fn endif_label(n: u32) -> String {
    format!("endif_{n}")
}

pub fn else_label(n: u32) -> String {
    format!("else_{n}")
}

pub fn startwhile_label(n: u32) -> String {
    format!("startwhile_{n}")
}

pub fn endwhile_label(n: u32) -> String {
    format!("endwhile_{n}")
}

/// A local variable or parameter slot as it appears in the subroutine's
/// declaration header: `name : size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDecl {
    pub name: String,
    pub size: u32,
}

/// The emitted form of one source function (§4.4, §6 "Output").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subroutine {
    pub name: String,
    pub params: Vec<String>,
    pub locals: Vec<LocalDecl>,
    pub body: Vec<Instruction>,
}

impl Subroutine {
    pub fn new(name: impl Into<String>) -> Self {
        Subroutine {
            name: name.into(),
            params: Vec::new(),
            locals: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn push_param(&mut self, name: impl Into<String>) {
        self.params.push(name.into());
    }

    pub fn push_local(&mut self, name: impl Into<String>, size: u32) {
        self.locals.push(LocalDecl {
            name: name.into(),
            size,
        });
    }

    pub fn emit(&mut self, instr: Instruction) {
        self.body.push(instr);
    }

    pub fn extend(&mut self, instrs: impl IntoIterator<Item = Instruction>) {
        self.body.extend(instrs);
    }
}

impl fmt::Display for Subroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}({})", self.name, self.params.join(", "))?;
        for local in &self.locals {
            writeln!(f, "{} : {}", local.name, local.size)?;
        }
        for instr in &self.body {
            writeln!(f, "{instr}")?;
        }
        Ok(())
    }
}

/// The whole compiled program: one subroutine per source function, in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub subroutines: Vec<Subroutine>,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subroutine: Subroutine) {
        self.subroutines.push(subroutine);
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sub) in self.subroutines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{sub}")?;
        }
        Ok(())
    }
}
