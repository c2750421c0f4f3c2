//! The six numbered end-to-end scenarios from the specification's testable
//! properties section: the canonical program, the stack round-trip, modular
//! arithmetic, the two solvers, and disassembly block separation.

use std::collections::VecDeque;
use std::io;

use synacor_vm::ackermann::find_teleporter_seed;
use synacor_vm::disasm::{disassemble, render};
use synacor_vm::vault::solve as solve_vault;
use synacor_vm::{Terminal, Vm};

/// A terminal backed by in-memory buffers, for driving the VM without a
/// real tty.
#[derive(Default)]
struct MemoryTerminal {
    input_lines: VecDeque<String>,
    output: Vec<u8>,
}

impl MemoryTerminal {
    fn with_lines<I: IntoIterator<Item = &'static str>>(lines: I) -> Self {
        MemoryTerminal {
            input_lines: lines.into_iter().map(String::from).collect(),
            output: Vec::new(),
        }
    }
}

impl Terminal for MemoryTerminal {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.input_lines.pop_front())
    }
}

#[test]
fn scenario_1_canonical_program() {
    let mut vm = Vm::new(
        vec![9, 32768, 32769, 4, 19, 32768, 0],
        MemoryTerminal::default(),
    );
    vm.set_register(1, (b'A' as u16).wrapping_sub(4));
    vm.run().expect("clean halt");
    assert_eq!(vm.registers()[0], 65);
}

#[test]
fn scenario_2_stack_round_trip() {
    let mut vm = Vm::new(
        vec![
            2, 123, // push 123
            2, 456, // push 456
            3, 32768, // pop reg0
            3, 32769, // pop reg1
            0,
        ],
        MemoryTerminal::default(),
    );
    vm.run().expect("clean halt");
    assert_eq!(vm.registers()[0], 456);
    assert_eq!(vm.registers()[1], 123);
}

#[test]
fn scenario_3_modular_arithmetic() {
    let mut vm = Vm::new(
        vec![
            1, 32768, 32758, // set reg0 32758
            9, 32768, 32768, 15, // add reg0 reg0 15
            0,
        ],
        MemoryTerminal::default(),
    );
    vm.run().expect("clean halt");
    assert_eq!(vm.registers()[0], 5);
}

#[test]
fn scenario_4_ackermann_solver_finds_reference_seed() {
    assert_eq!(find_teleporter_seed(), Some(25734));
}

#[test]
fn scenario_5_vault_solver_finds_minimal_path() {
    let path = solve_vault().expect("vault has a solution for the reference layout");
    assert_eq!(path.len(), 12);
}

#[test]
fn scenario_6_disassembly_block_separation() {
    // jmp 10 at address 0, followed by a noop at address 2.
    let records = disassemble(&[6, 10, 21]);
    let listing = render(&records);
    let lines: Vec<&str> = listing.lines().collect();
    assert!(lines[0].starts_with("0x0000"));
    assert_eq!(lines[1], "", "blank separator after jmp");
    assert!(lines[2].starts_with("0x0002"));
}

#[test]
fn in_serves_characters_then_the_buffered_newline() {
    let mut vm = Vm::new(
        vec![
            20, 32768, // in reg0
            19, 32768, // out reg0
            20, 32769, // in reg1
            19, 32769, // out reg1
            0,
        ],
        MemoryTerminal::with_lines(["A"]),
    );
    vm.run().expect("clean halt");
    let terminal = vm.into_terminal();
    assert_eq!(terminal.output, vec![b'A', b'\n']);
}
