//! The VM core: registers, stack, memory, the fetch-decode-execute loop, and
//! the buffered-line model of interactive input.
//!
//! `ExecOutcome` replaces the source's raise-on-failure control flow (spec
//! §9: "custom exceptions for control flow → explicit result values"). The
//! run loop in [`Vm::run`] advances while the outcome is `Continue`.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use tracing::{debug, error, info, warn};

use crate::cell::{self, Operand, MEMORY_SIZE};
use crate::control::{self, ControlOutcome};
use crate::error::{ControlError, ExecError};
use crate::opcodes::OPCODES;

/// What [`Vm::terminal_read`] produced: a genuine input byte, or notice that
/// the operator's `!halt`/`!kill` took effect while we were waiting for one.
pub(crate) enum InputResult {
    Byte(u8),
    Stopped,
}

/// The result of executing one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Keep fetching.
    Continue,
    /// `halt`, or `ret` against an empty stack — a clean stop.
    Halted,
    /// A fatal error, reported with the failing instruction's PC baked in.
    Failed(ExecError),
}

/// A source of terminal character I/O, abstracted so the VM can be driven
/// by a real terminal or by an in-memory harness in tests.
pub trait Terminal {
    /// Write one output byte (the low 8 bits of an `out` argument).
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;
    /// Block for one full line of input, returned without its trailing
    /// newline. Returns `Ok(None)` at end-of-stream.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// The real terminal: line-buffered stdin, byte-at-a-time stdout.
pub struct StdioTerminal {
    stdin: io::BufReader<io::Stdin>,
}

impl Default for StdioTerminal {
    fn default() -> Self {
        StdioTerminal {
            stdin: io::BufReader::new(io::stdin()),
        }
    }
}

impl Terminal for StdioTerminal {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(&[byte])?;
        handle.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let n = self.stdin.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

/// The VM itself: one owned instance per run, per the spec's "no true
/// globals" design note. Bundles memory, registers, stack, program counter,
/// the pending input byte buffer, and the terminal it talks to.
pub struct Vm<T: Terminal = StdioTerminal> {
    mem: Vec<u16>,
    registers: [u16; 8],
    stack: Vec<u16>,
    pc: u16,
    input_buffer: VecDeque<u8>,
    stopped_by_operator: bool,
    history: Vec<String>,
    terminal: T,
}

impl<T: Terminal> Vm<T> {
    /// Build a VM over a loaded image, padding the rest of the 15-bit
    /// address space with zeroes.
    pub fn new(image: Vec<u16>, terminal: T) -> Self {
        let mut mem = image;
        mem.resize(MEMORY_SIZE, 0);
        Vm {
            mem,
            registers: [0; 8],
            stack: Vec::new(),
            pc: 0,
            input_buffer: VecDeque::new(),
            stopped_by_operator: false,
            history: Vec::new(),
            terminal,
        }
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn registers(&self) -> &[u16; 8] {
        &self.registers
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn memory(&self) -> &[u16] {
        &self.mem
    }

    /// Consume the VM and hand back its terminal, e.g. to inspect an
    /// in-memory harness's captured output after [`Vm::run`] returns.
    pub fn into_terminal(self) -> T {
        self.terminal
    }

    /// Seed a register directly, bypassing the program counter. Exposed for
    /// callers that prime a VM's initial state before running it.
    pub fn set_register(&mut self, reg: u8, value: u16) {
        self.set_reg(reg, value & cell::MAX_LITERAL);
    }

    pub(crate) fn jump(&mut self, target: u16) {
        self.pc = target;
    }

    pub(crate) fn set_reg(&mut self, reg: u8, value: u16) {
        debug_assert!(value <= cell::MAX_LITERAL, "register values stay 15-bit");
        self.registers[reg as usize] = value;
    }

    pub(crate) fn mem_read(&self, addr: u16) -> u16 {
        self.mem[addr as usize]
    }

    pub(crate) fn mem_write(&mut self, addr: u16, value: u16) {
        self.mem[addr as usize] = value;
    }

    pub(crate) fn stack_push(&mut self, value: u16) {
        self.stack.push(value);
    }

    pub(crate) fn stack_pop(&mut self, pc: u16) -> Result<u16, ExecError> {
        self.stack
            .pop()
            .ok_or(ExecError::StackUnderflow { pc })
    }

    /// Resolve an operand cell to its numeric value: registers read, literals
    /// pass through, anything else is a fatal `InvalidOperand`.
    pub(crate) fn resolve_value(&self, pc: u16, raw: u16) -> Result<u16, ExecError> {
        match cell::classify(raw) {
            Operand::Literal(v) => Ok(v),
            Operand::Register(r) => Ok(self.registers[r as usize]),
            Operand::Invalid(v) => Err(ExecError::InvalidOperand { pc, operand: v }),
        }
    }

    /// Resolve an operand cell that must name a write destination: only a
    /// register classification is acceptable.
    pub(crate) fn resolve_dest(&self, pc: u16, raw: u16) -> Result<u8, ExecError> {
        match cell::classify(raw) {
            Operand::Register(r) => Ok(r),
            Operand::Literal(v) => Err(ExecError::WriteToLiteral { pc, operand: v }),
            Operand::Invalid(v) => Err(ExecError::InvalidOperand { pc, operand: v }),
        }
    }

    pub(crate) fn terminal_write(&mut self, byte: u8) -> Result<(), ExecError> {
        self.terminal
            .write_byte(byte)
            .map_err(|e| ExecError::IoFailure(e.to_string()))
    }

    /// Serve the next input byte, reading and buffering a whole line (and
    /// servicing any control commands encountered) whenever the buffer runs
    /// dry. This is the "buffered line serving" re-architecture from spec
    /// §9: a program reading character-by-character up to a newline sees
    /// the same byte stream it would from blocking per-keystroke reads.
    pub(crate) fn terminal_read(&mut self, pc: u16) -> Result<InputResult, ExecError> {
        loop {
            if let Some(byte) = self.input_buffer.pop_front() {
                return Ok(InputResult::Byte(byte));
            }
            if self.stopped_by_operator {
                return Ok(InputResult::Stopped);
            }
            match self
                .terminal
                .read_line()
                .map_err(|e| ExecError::IoFailure(e.to_string()))?
            {
                None => {
                    return Err(ExecError::IoFailure(
                        "input stream closed while program awaited input".into(),
                    ))
                }
                Some(line) => {
                    if let Some(command) = line.strip_prefix('!') {
                        debug!(command, "control channel command");
                        self.history.push(line.clone());
                        self.run_control_command(command);
                        continue;
                    }
                    self.input_buffer.extend(line.bytes());
                    self.input_buffer.push_back(b'\n');
                }
            }
            let _ = pc;
        }
    }

    fn run_control_command(&mut self, command: &str) {
        match control::dispatch(self, command) {
            ControlOutcome::Handled => {}
            ControlOutcome::Stop => {
                self.stopped_by_operator = true;
            }
            ControlOutcome::Error(e) => report_control_error(&e),
        }
    }

    pub(crate) fn command_history(&self) -> &[String] {
        &self.history
    }

    pub(crate) fn operator_stop_requested(&self) -> bool {
        self.stopped_by_operator
    }

    /// Execute a single instruction.
    pub fn step(&mut self) -> ExecOutcome {
        if self.stopped_by_operator {
            return ExecOutcome::Halted;
        }
        let pc = self.pc;
        let opcode_cell = self.mem[pc as usize];
        let Some(info) = OPCODES.get(opcode_cell as usize) else {
            return ExecOutcome::Failed(ExecError::UnknownOpcode {
                pc,
                opcode: opcode_cell,
            });
        };
        let mut args = [0u16; 3];
        for (i, slot) in args.iter_mut().enumerate().take(info.arity) {
            *slot = self.mem[(pc as usize + 1 + i) % MEMORY_SIZE];
        }
        (info.handler)(self, &args[..info.arity], pc)
    }

    /// Run to completion: fetch-decode-execute until halted or failed.
    pub fn run(&mut self) -> Result<(), ExecError> {
        info!(pc = self.pc, "vm starting");
        loop {
            match self.step() {
                ExecOutcome::Continue => {}
                ExecOutcome::Halted => {
                    if self.operator_stop_requested() {
                        warn!("vm stopped by operator");
                    } else {
                        info!("vm halted");
                    }
                    return Ok(());
                }
                ExecOutcome::Failed(e) => {
                    error!(pc = %self.pc, error = %e, "vm execution failed");
                    return Err(e);
                }
            }
        }
    }
}

fn report_control_error(e: &ControlError) {
    eprintln!("control command error: {e}");
}


#[cfg(test)]
mod tests {
    use super::test_support::FakeTerminal;
    use super::*;

    fn vm_with(program: Vec<u16>) -> Vm<FakeTerminal> {
        Vm::new(program, FakeTerminal::default())
    }

    #[test]
    fn canonical_program_prints_a_and_sets_reg0() {
        // spec's canonical program: add reg0 reg1 4; out reg0; halt
        let mut vm = vm_with(vec![9, 32768, 32769, 4, 19, 32768, 0]);
        vm.set_register(1, b'A' as u16 - 4);
        vm.run().unwrap();
        assert_eq!(vm.registers()[0], 65);
        assert_eq!(vm.terminal.output, vec![b'A']);
    }

    #[test]
    fn stack_round_trip() {
        let mut vm = vm_with(vec![
            2, 123, // push 123
            2, 456, // push 456
            3, 32768, // pop reg0
            3, 32769, // pop reg1
            0, // halt
        ]);
        vm.run().unwrap();
        assert_eq!(vm.registers()[0], 456);
        assert_eq!(vm.registers()[1], 123);
    }

    #[test]
    fn modular_add_wraps() {
        let mut vm = vm_with(vec![
            1, 32768, 32758, // set reg0 32758
            9, 32768, 32768, 15, // add reg0 reg0 15
            0,
        ]);
        vm.run().unwrap();
        assert_eq!(vm.registers()[0], 5);
    }

    #[test]
    fn add_wraps_at_max_literal() {
        let mut vm = vm_with(vec![9, 32768, 32767, 1, 0]);
        vm.run().unwrap();
        assert_eq!(vm.registers()[0], 0);
    }

    #[test]
    fn mult_wraps() {
        let mut vm = vm_with(vec![10, 32768, 32767, 32767, 0]);
        vm.run().unwrap();
        assert_eq!(vm.registers()[0], 1);
    }

    #[test]
    fn not_complements_15_bits() {
        let mut vm = vm_with(vec![14, 32768, 0, 0]);
        vm.run().unwrap();
        assert_eq!(vm.registers()[0], 32767);

        let mut vm2 = vm_with(vec![14, 32768, 32767, 0]);
        vm2.run().unwrap();
        assert_eq!(vm2.registers()[0], 0);
    }

    #[test]
    fn ret_on_empty_stack_halts_cleanly() {
        let mut vm = vm_with(vec![18]);
        assert!(vm.run().is_ok());
    }

    #[test]
    fn pop_on_empty_stack_is_fatal() {
        let mut vm = vm_with(vec![3, 32768]);
        assert!(matches!(
            vm.run(),
            Err(ExecError::StackUnderflow { pc: 0 })
        ));
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let mut vm = vm_with(vec![22]);
        assert!(matches!(
            vm.run(),
            Err(ExecError::UnknownOpcode { pc: 0, opcode: 22 })
        ));
    }

    #[test]
    fn in_serves_buffered_line_then_newline() {
        let mut vm = Vm::new(
            vec![
                20, 32768, // in reg0
                19, 32768, // out reg0
                20, 32769, // in reg1
                19, 32769, // out reg1
                0,
            ],
            FakeTerminal::with_lines(["A"]),
        );
        vm.run().unwrap();
        assert_eq!(vm.terminal.output, vec![b'A', b'\n']);
    }

    #[test]
    fn halt_control_command_stops_a_pending_in_without_blocking_further() {
        // the program never gets the chance to see an actual input line —
        // `!halt` takes effect right at the boundary where it would
        // otherwise have served the next buffered byte (spec §5).
        let mut vm = Vm::new(
            vec![20, 32768, 0], // in reg0; halt
            FakeTerminal::with_lines(["!halt"]),
        );
        assert!(vm.run().is_ok());
        assert!(vm.operator_stop_requested());
        assert_eq!(vm.registers()[0], 0);
    }

    #[test]
    fn eq_and_gt_write_only_zero_or_one() {
        let mut vm = vm_with(vec![4, 32768, 1, 1, 5, 32769, 2, 1, 0]);
        vm.run().unwrap();
        assert_eq!(vm.registers()[0], 1);
        assert_eq!(vm.registers()[1], 1);
    }
}
