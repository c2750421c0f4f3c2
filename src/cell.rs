//! Program image loading and operand classification.
//!
//! A program image is a flat array of 16-bit cells, loaded verbatim from a
//! little-endian byte stream. This module draws no distinction between code
//! and data cells at load time — that distinction only exists once the VM
//! starts fetching and decoding at a particular program counter.

use crate::error::LoadError;

/// Highest valid cell value (15-bit address space, plus 8 register slots).
pub const MAX_LITERAL: u16 = 32767;
/// First cell value that denotes a register.
pub const REGISTER_BASE: u16 = 32768;
/// Number of general-purpose registers.
pub const REGISTER_COUNT: u16 = 8;
/// Total addressable cells in the image.
pub const MEMORY_SIZE: usize = 32768;

/// What a raw 16-bit cell means when it appears as an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// A literal value in `0..=32767`.
    Literal(u16),
    /// A register index in `0..=7`, already subtracted from the raw cell.
    Register(u8),
    /// A cell value of `32776..=65535`: not a valid operand anywhere.
    Invalid(u16),
}

/// Classify a raw cell as it would be interpreted in operand position.
///
/// This is the one place the 0..32767 / 32768..32775 / 32776.. split is
/// encoded; the VM and the disassembler both call through here so the two
/// never drift apart.
pub fn classify(cell: u16) -> Operand {
    if cell <= MAX_LITERAL {
        Operand::Literal(cell)
    } else if cell < REGISTER_BASE + REGISTER_COUNT {
        Operand::Register((cell - REGISTER_BASE) as u8)
    } else {
        Operand::Invalid(cell)
    }
}

/// Load a program image from a little-endian byte stream.
///
/// The stream length must be even; each pair of bytes becomes one cell.
/// No further validation is performed — an image may contain cells outside
/// `0..=32775` in data regions, and remains loadable. Those cells only
/// become an error if the VM ever tries to read them as an operand value.
pub fn load(bytes: &[u8]) -> Result<Vec<u16>, LoadError> {
    if bytes.len() % 2 != 0 {
        return Err(LoadError::OddLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_literal_register_invalid() {
        assert_eq!(classify(0), Operand::Literal(0));
        assert_eq!(classify(32767), Operand::Literal(32767));
        assert_eq!(classify(32768), Operand::Register(0));
        assert_eq!(classify(32775), Operand::Register(7));
        assert_eq!(classify(32776), Operand::Invalid(32776));
        assert_eq!(classify(65535), Operand::Invalid(65535));
    }

    #[test]
    fn loads_little_endian_pairs() {
        let cells = load(&[9, 0, 0, 128]).unwrap();
        assert_eq!(cells, vec![9, 32768]);
    }

    #[test]
    fn rejects_odd_length() {
        assert!(matches!(load(&[1, 2, 3]), Err(LoadError::OddLength(3))));
    }
}
