//! Loaders for the constant ROM and the two microcode ROM banks.
//!
//! Both are raw little-endian dumps with no header: the constant ROM is
//! packed as one `u16` per word, the microcode ROM as one `u32` per word.
//! Files that are short OR long are rejected — a truncated or
//! concatenated-twice dump is as wrong as a missing one.

use crate::error::Error;

/// Number of words addressable by the 8-bit constant address (RSEL·8 | BS).
pub const CONSTANT_SIZE: usize = 256;

/// Number of microinstructions per bank (10-bit NEXT field).
pub const MICROCODE_SIZE: usize = 1024;

/// Number of microcode banks (Alto II has two, selected by the bank task bit).
pub const NUM_MICROCODE_BANKS: usize = 2;

/// Parse a constant ROM dump into exactly [`CONSTANT_SIZE`] words.
pub fn load_constant_rom(data: &[u8]) -> Result<[u16; CONSTANT_SIZE], Error> {
    let expected_bytes = CONSTANT_SIZE * 2;
    if data.len() != expected_bytes {
        return Err(Error::InvalidRom {
            expected: CONSTANT_SIZE,
            found: data.len() / 2,
        });
    }
    let mut rom = [0u16; CONSTANT_SIZE];
    for (word, chunk) in rom.iter_mut().zip(data.chunks_exact(2)) {
        *word = u16::from_le_bytes([chunk[0], chunk[1]]);
    }
    Ok(rom)
}

/// Parse one microcode bank dump into exactly [`MICROCODE_SIZE`] microwords.
pub fn load_microcode_bank(data: &[u8]) -> Result<[u32; MICROCODE_SIZE], Error> {
    let expected_bytes = MICROCODE_SIZE * 4;
    if data.len() != expected_bytes {
        return Err(Error::InvalidRom {
            expected: MICROCODE_SIZE,
            found: data.len() / 4,
        });
    }
    let mut rom = [0u32; MICROCODE_SIZE];
    for (word, chunk) in rom.iter_mut().zip(data.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(rom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le16(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn le32(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn constant_rom_rejects_short_file() {
        let data = le16(&[0; CONSTANT_SIZE - 1]);
        assert!(load_constant_rom(&data).is_err());
    }

    #[test]
    fn constant_rom_rejects_long_file() {
        let mut data = le16(&[0; CONSTANT_SIZE]);
        data.extend_from_slice(&[0, 0]);
        assert!(load_constant_rom(&data).is_err());
    }

    #[test]
    fn constant_rom_round_trips_values() {
        let mut words = [0u16; CONSTANT_SIZE];
        words[0] = 0xBEEF;
        words[CONSTANT_SIZE - 1] = 0x1234;
        let rom = load_constant_rom(&le16(&words)).expect("valid size");
        assert_eq!(rom[0], 0xBEEF);
        assert_eq!(rom[CONSTANT_SIZE - 1], 0x1234);
    }

    #[test]
    fn microcode_bank_rejects_wrong_size() {
        let data = le32(&[0; MICROCODE_SIZE / 2]);
        assert!(load_microcode_bank(&data).is_err());
    }

    #[test]
    fn microcode_bank_round_trips_values() {
        let mut words = [0u32; MICROCODE_SIZE];
        words[5] = 0xDEAD_BEEF;
        let rom = load_microcode_bank(&le32(&words)).expect("valid size");
        assert_eq!(rom[5], 0xDEAD_BEEF);
    }
}
