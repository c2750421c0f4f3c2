//! Error types for every component.
//!
//! Split along the same lines as the teacher's `MemoryErr`/`InvokeErr` pair:
//! a narrow error for the thing that failed, joined into a broader error at
//! the call site that had enough context to report it usefully (PC, opcode,
//! operand). Library code here never reaches for `anyhow` — that conversion
//! happens only at the CLI boundary.

use thiserror::Error;

/// Failure loading a program image from a byte stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The byte stream's length wasn't a multiple of two.
    #[error("image length {0} is not a multiple of two")]
    OddLength(usize),
}

/// A fatal execution failure, reported with the program counter at which it
/// occurred so the operator can correlate it against a disassembly listing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecError {
    /// An operand cell was `>= 32776` where a value was required.
    #[error("invalid operand {operand} at pc {pc:#06x}")]
    InvalidOperand { pc: u16, operand: u16 },
    /// A write destination operand classified as `Literal` rather than
    /// `Register` — you cannot write through a literal.
    #[error("cannot write through literal operand {operand} at pc {pc:#06x}")]
    WriteToLiteral { pc: u16, operand: u16 },
    /// `pop` was attempted against an empty stack.
    #[error("stack underflow at pc {pc:#06x}")]
    StackUnderflow { pc: u16 },
    /// The opcode byte fetched at `pc` was outside `0..=21`.
    #[error("unknown opcode {opcode} at pc {pc:#06x}")]
    UnknownOpcode { pc: u16, opcode: u16 },
    /// The terminal (or whatever stream stands in for it) failed.
    #[error("terminal i/o failure: {0}")]
    IoFailure(String),
}

/// A malformed control-channel command. Never fatal — the VM reports this
/// to the operator and keeps running.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("{0:?} expects {1} argument(s)")]
    WrongArity(String, usize),
    #[error("{0:?} is not valid hexadecimal")]
    BadHex(String),
    #[error("register index {0} is out of range 0..=7")]
    BadRegister(u16),
    #[error("address {0:#x} is out of range 0..=0x7fff")]
    OutOfRange(u64),
    #[error("failed to write {path:?}: {reason}")]
    FileWrite { path: String, reason: String },
}
