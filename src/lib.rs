//! A toy 16-bit virtual machine matching the Synacor OSCON 2012 challenge
//! architecture, plus the disassembler and the two analytical solvers used
//! to defeat the puzzles embedded in a program that runs on it.
//!
//! The VM's 15-bit address space, 8 registers, and unbounded stack are all
//! owned by a single [`machine::Vm`] instance per run — there is no
//! process-wide state. The disassembler and the solvers are pure functions
//! over an image or a fixed problem instance; none of them touch the VM.

pub mod ackermann;
pub mod cell;
pub mod control;
pub mod disasm;
pub mod error;
pub mod machine;
pub mod opcodes;
pub mod vault;

pub use cell::{classify, load, Operand};
pub use error::{ControlError, ExecError, LoadError};
pub use machine::{ExecOutcome, StdioTerminal, Terminal, Vm};
