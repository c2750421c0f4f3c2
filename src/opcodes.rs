//! The 22-opcode table and the static dispatch that replaces the source's
//! dynamic per-method opcode registration (see `spec.md` §9: "dynamic opcode
//! dispatch → static dispatch"). Each opcode is a fixed row: a mnemonic (also
//! used by the disassembler), an argument count, and a handler function
//! pointer. The table is built once, at compile time, and never mutated.

use crate::error::ExecError;
use crate::machine::{ExecOutcome, InputResult, Vm};

/// One row of the opcode table.
pub struct OpcodeInfo {
    pub mnemonic: &'static str,
    pub arity: usize,
    pub handler: fn(&mut Vm, &[u16], u16) -> ExecOutcome,
}

macro_rules! op {
    ($mnemonic:literal, $arity:literal, $handler:path) => {
        OpcodeInfo {
            mnemonic: $mnemonic,
            arity: $arity,
            handler: $handler,
        }
    };
}

/// Opcode table, indexed by opcode value 0..=21.
pub static OPCODES: [OpcodeInfo; 22] = [
    op!("halt", 0, op_halt),
    op!("set", 2, op_set),
    op!("push", 1, op_push),
    op!("pop", 1, op_pop),
    op!("eq", 3, op_eq),
    op!("gt", 3, op_gt),
    op!("jmp", 1, op_jmp),
    op!("jt", 2, op_jt),
    op!("jf", 2, op_jf),
    op!("add", 3, op_add),
    op!("mult", 3, op_mult),
    op!("mod", 3, op_mod),
    op!("and", 3, op_and),
    op!("or", 3, op_or),
    op!("not", 2, op_not),
    op!("rmem", 2, op_rmem),
    op!("wmem", 2, op_wmem),
    op!("call", 1, op_call),
    op!("ret", 0, op_ret),
    op!("out", 1, op_out),
    op!("in", 1, op_in),
    op!("noop", 0, op_noop),
];

/// Advance `pc` past the opcode cell and its `arity` argument cells — the
/// default next-instruction address for every non-branching opcode.
fn next_pc(pc: u16, arity: usize) -> u16 {
    pc.wrapping_add(1 + arity as u16)
}

fn fail(_vm: &mut Vm, e: ExecError) -> ExecOutcome {
    ExecOutcome::Failed(e)
}

fn op_halt(vm: &mut Vm, _args: &[u16], _pc: u16) -> ExecOutcome {
    let _ = vm;
    ExecOutcome::Halted
}

fn op_set(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let val = match vm.resolve_value(pc, args[1]) {
        Ok(v) => v,
        Err(e) => return fail(vm, e),
    };
    vm.set_reg(dest, val);
    vm.jump(next_pc(pc, 2));
    ExecOutcome::Continue
}

fn op_push(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let val = match vm.resolve_value(pc, args[0]) {
        Ok(v) => v,
        Err(e) => return fail(vm, e),
    };
    vm.stack_push(val);
    vm.jump(next_pc(pc, 1));
    ExecOutcome::Continue
}

fn op_pop(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let val = match vm.stack_pop(pc) {
        Ok(v) => v,
        Err(e) => return fail(vm, e),
    };
    vm.set_reg(dest, val);
    vm.jump(next_pc(pc, 1));
    ExecOutcome::Continue
}

fn op_eq(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let (b, c) = match (vm.resolve_value(pc, args[1]), vm.resolve_value(pc, args[2])) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => return fail(vm, e),
    };
    vm.set_reg(dest, if b == c { 1 } else { 0 });
    vm.jump(next_pc(pc, 3));
    ExecOutcome::Continue
}

fn op_gt(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let (b, c) = match (vm.resolve_value(pc, args[1]), vm.resolve_value(pc, args[2])) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => return fail(vm, e),
    };
    vm.set_reg(dest, if b > c { 1 } else { 0 });
    vm.jump(next_pc(pc, 3));
    ExecOutcome::Continue
}

fn op_jmp(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let target = match vm.resolve_value(pc, args[0]) {
        Ok(v) => v,
        Err(e) => return fail(vm, e),
    };
    vm.jump(target);
    ExecOutcome::Continue
}

fn op_jt(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let (cond, target) = match (vm.resolve_value(pc, args[0]), vm.resolve_value(pc, args[1])) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return fail(vm, e),
    };
    vm.jump(if cond != 0 { target } else { next_pc(pc, 2) });
    ExecOutcome::Continue
}

fn op_jf(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let (cond, target) = match (vm.resolve_value(pc, args[0]), vm.resolve_value(pc, args[1])) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return fail(vm, e),
    };
    vm.jump(if cond == 0 { target } else { next_pc(pc, 2) });
    ExecOutcome::Continue
}

fn op_add(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let (b, c) = match (vm.resolve_value(pc, args[1]), vm.resolve_value(pc, args[2])) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => return fail(vm, e),
    };
    vm.set_reg(dest, ((b as u32 + c as u32) % 32768) as u16);
    vm.jump(next_pc(pc, 3));
    ExecOutcome::Continue
}

fn op_mult(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let (b, c) = match (vm.resolve_value(pc, args[1]), vm.resolve_value(pc, args[2])) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => return fail(vm, e),
    };
    vm.set_reg(dest, ((b as u32 * c as u32) % 32768) as u16);
    vm.jump(next_pc(pc, 3));
    ExecOutcome::Continue
}

fn op_mod(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let (b, c) = match (vm.resolve_value(pc, args[1]), vm.resolve_value(pc, args[2])) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => return fail(vm, e),
    };
    vm.set_reg(dest, b % c);
    vm.jump(next_pc(pc, 3));
    ExecOutcome::Continue
}

fn op_and(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let (b, c) = match (vm.resolve_value(pc, args[1]), vm.resolve_value(pc, args[2])) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => return fail(vm, e),
    };
    vm.set_reg(dest, b & c);
    vm.jump(next_pc(pc, 3));
    ExecOutcome::Continue
}

fn op_or(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let (b, c) = match (vm.resolve_value(pc, args[1]), vm.resolve_value(pc, args[2])) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => return fail(vm, e),
    };
    vm.set_reg(dest, b | c);
    vm.jump(next_pc(pc, 3));
    ExecOutcome::Continue
}

fn op_not(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let b = match vm.resolve_value(pc, args[1]) {
        Ok(b) => b,
        Err(e) => return fail(vm, e),
    };
    vm.set_reg(dest, (!b) & 0x7FFF);
    vm.jump(next_pc(pc, 2));
    ExecOutcome::Continue
}

fn op_rmem(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let addr = match vm.resolve_value(pc, args[1]) {
        Ok(a) => a,
        Err(e) => return fail(vm, e),
    };
    let val = vm.mem_read(addr);
    vm.set_reg(dest, val);
    vm.jump(next_pc(pc, 2));
    ExecOutcome::Continue
}

fn op_wmem(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let addr = match vm.resolve_value(pc, args[0]) {
        Ok(a) => a,
        Err(e) => return fail(vm, e),
    };
    let val = match vm.resolve_value(pc, args[1]) {
        Ok(v) => v,
        Err(e) => return fail(vm, e),
    };
    vm.mem_write(addr, val);
    vm.jump(next_pc(pc, 2));
    ExecOutcome::Continue
}

fn op_call(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let target = match vm.resolve_value(pc, args[0]) {
        Ok(v) => v,
        Err(e) => return fail(vm, e),
    };
    vm.stack_push(next_pc(pc, 1));
    vm.jump(target);
    ExecOutcome::Continue
}

fn op_ret(vm: &mut Vm, _args: &[u16], pc: u16) -> ExecOutcome {
    match vm.stack_pop(pc) {
        Ok(target) => {
            vm.jump(target);
            ExecOutcome::Continue
        }
        Err(_) => ExecOutcome::Halted,
    }
}

fn op_out(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let val = match vm.resolve_value(pc, args[0]) {
        Ok(v) => v,
        Err(e) => return fail(vm, e),
    };
    if let Err(e) = vm.terminal_write(val as u8) {
        return fail(vm, e);
    }
    vm.jump(next_pc(pc, 1));
    ExecOutcome::Continue
}

fn op_in(vm: &mut Vm, args: &[u16], pc: u16) -> ExecOutcome {
    let dest = match vm.resolve_dest(pc, args[0]) {
        Ok(d) => d,
        Err(e) => return fail(vm, e),
    };
    let byte = match vm.terminal_read(pc) {
        Ok(InputResult::Byte(b)) => b,
        Ok(InputResult::Stopped) => return ExecOutcome::Halted,
        Err(e) => return fail(vm, e),
    };
    vm.set_reg(dest, byte as u16);
    vm.jump(next_pc(pc, 1));
    ExecOutcome::Continue
}

fn op_noop(vm: &mut Vm, _args: &[u16], pc: u16) -> ExecOutcome {
    vm.jump(next_pc(pc, 0));
    ExecOutcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_contiguous_and_ordered() {
        for (i, info) in OPCODES.iter().enumerate() {
            assert!(info.arity <= 3, "opcode {i} ({}) has arity > 3", info.mnemonic);
        }
    }
}
