//! The operator-facing control channel multiplexed onto the VM's input
//! stream: any line starting with `!` is intercepted before it ever reaches
//! the program's `in` opcode (spec §4.B, §5 — "serviced at the boundary
//! where the VM would otherwise return a buffered input character").
//!
//! Integer arguments are always hexadecimal, per spec §6.

use std::fs;

use tracing::info;

use crate::cell::MEMORY_SIZE;
use crate::error::ControlError;
use crate::machine::{Terminal, Vm};

/// What happened after dispatching one control command.
pub enum ControlOutcome {
    /// The command ran; the VM keeps going.
    Handled,
    /// `!halt` / `!kill`: the VM should stop at the next opportunity.
    Stop,
    /// The command was malformed. Never fatal (spec §7: `ControlCommandError`).
    Error(ControlError),
}

const HELP_TEXT: &str = "\
available commands:
  !help                 show this text
  !history              persist command history to history.txt
  !halt / !kill         stop the vm
  !dump                 write the current memory image to dump.bin
  !pos                  print the program counter
  !getreg               print all registers
  !getstack             print the stack
  !setreg <i> <v>       set register i to hex value v
  !poke <i> <v1> <v2>.. overwrite mem[i], mem[i+1].. with hex values
  !peek <i> [n]         print n cells (default 1) starting at i";

fn parse_hex(token: &str) -> Result<u32, ControlError> {
    u32::from_str_radix(token.trim_start_matches("0x"), 16)
        .map_err(|_| ControlError::BadHex(token.to_string()))
}

/// Dispatch one control-channel command (without its leading `!`).
pub fn dispatch<T: Terminal>(vm: &mut Vm<T>, command: &str) -> ControlOutcome {
    let mut parts = command.split_whitespace();
    let Some(name) = parts.next() else {
        return ControlOutcome::Error(ControlError::UnknownCommand(String::new()));
    };
    let args: Vec<&str> = parts.collect();

    match name {
        "help" => {
            println!("{HELP_TEXT}");
            ControlOutcome::Handled
        }
        "history" => match persist_history(vm) {
            Ok(()) => ControlOutcome::Handled,
            Err(e) => ControlOutcome::Error(e),
        },
        "halt" | "kill" => {
            info!("operator requested halt");
            ControlOutcome::Stop
        }
        "dump" => match dump_memory(vm) {
            Ok(()) => ControlOutcome::Handled,
            Err(e) => ControlOutcome::Error(e),
        },
        "pos" => {
            println!("pc = {:#06x}", vm.pc());
            ControlOutcome::Handled
        }
        "getreg" => {
            for (i, r) in vm.registers().iter().enumerate() {
                println!("r{i} = {r:#06x}");
            }
            ControlOutcome::Handled
        }
        "getstack" => {
            for (i, v) in vm.stack().iter().enumerate() {
                println!("[{i}] {v:#06x}");
            }
            ControlOutcome::Handled
        }
        "setreg" => match set_reg(vm, &args) {
            Ok(()) => ControlOutcome::Handled,
            Err(e) => ControlOutcome::Error(e),
        },
        "poke" => match poke(vm, &args) {
            Ok(()) => ControlOutcome::Handled,
            Err(e) => ControlOutcome::Error(e),
        },
        "peek" => match peek(vm, &args) {
            Ok(()) => ControlOutcome::Handled,
            Err(e) => ControlOutcome::Error(e),
        },
        other => ControlOutcome::Error(ControlError::UnknownCommand(other.to_string())),
    }
}

fn set_reg<T: Terminal>(vm: &mut Vm<T>, args: &[&str]) -> Result<(), ControlError> {
    if args.len() != 2 {
        return Err(ControlError::WrongArity("setreg".into(), 2));
    }
    let index = parse_hex(args[0])?;
    let value = parse_hex(args[1])?;
    if index > 7 {
        return Err(ControlError::BadRegister(index as u16));
    }
    vm.set_reg(index as u8, (value & 0x7FFF) as u16);
    Ok(())
}

fn poke<T: Terminal>(vm: &mut Vm<T>, args: &[&str]) -> Result<(), ControlError> {
    if args.len() < 2 {
        return Err(ControlError::WrongArity("poke".into(), 2));
    }
    let start = parse_hex(args[0])? as u64;
    for (offset, token) in args[1..].iter().enumerate() {
        let value = parse_hex(token)?;
        let addr = start + offset as u64;
        if addr >= MEMORY_SIZE as u64 {
            return Err(ControlError::OutOfRange(addr));
        }
        vm.mem_write(addr as u16, value as u16);
    }
    Ok(())
}

fn peek<T: Terminal>(vm: &mut Vm<T>, args: &[&str]) -> Result<(), ControlError> {
    if args.is_empty() || args.len() > 2 {
        return Err(ControlError::WrongArity("peek".into(), 1));
    }
    let start = parse_hex(args[0])? as u64;
    let n = match args.get(1) {
        Some(tok) => parse_hex(tok)? as u64,
        None => 1,
    };
    let end = start + n;
    if start >= MEMORY_SIZE as u64 || end > MEMORY_SIZE as u64 {
        return Err(ControlError::OutOfRange(end.saturating_sub(1).max(start)));
    }
    for i in 0..n {
        let addr = (start + i) as u16;
        println!("[{addr:#06x}] {:#06x}", vm.mem_read(addr));
    }
    Ok(())
}

fn persist_history<T: Terminal>(vm: &Vm<T>) -> Result<(), ControlError> {
    let contents = vm.command_history().join("\n");
    fs::write("history.txt", contents).map_err(|e| ControlError::FileWrite {
        path: "history.txt".into(),
        reason: e.to_string(),
    })
}

fn dump_memory<T: Terminal>(vm: &Vm<T>) -> Result<(), ControlError> {
    let mut bytes = Vec::with_capacity(vm.memory().len() * 2);
    for cell in vm.memory() {
        bytes.extend_from_slice(&cell.to_le_bytes());
    }
    fs::write("dump.bin", bytes).map_err(|e| ControlError::FileWrite {
        path: "dump.bin".into(),
        reason: e.to_string(),
    })
}
