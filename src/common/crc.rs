// src/common/crc.rs

use super::error::SensorError;
use crc::{Algorithm, Crc};

/// CRC-8 used by Sensirion humidity sensors (CRC-8/NRSC-5).
/// Polynomial: 0x31 (x^8 + x^5 + x^4 + 1)
/// Initial Value: 0xFF
/// Input Reflected: false
/// Output Reflected: false
/// Final XOR: 0x00
/// Check Value: 0xF7 (for "123456789")
pub const SENSIRION_CRC: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0xFF,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xF7,
    residue: 0x00,
};

const CRC_COMPUTER: Crc<u8> = Crc::<u8>::new(&SENSIRION_CRC);

/// Calculates the CRC-8 over `data`.
///
/// Every 16-bit word a Sensirion chip sends is followed by this checksum
/// computed over its two bytes.
#[inline]
pub fn calculate_crc8(data: &[u8]) -> u8 {
    CRC_COMPUTER.checksum(data)
}

/// Verifies a `[msb, lsb, crc]` word group.
///
/// # Returns
///
/// * `Ok(u16)` with the big-endian word if the checksum matches.
/// * `Err(SensorError::ChecksumMismatch)` otherwise; the word is not returned.
pub fn verify_word<E>(group: &[u8; 3]) -> Result<u16, SensorError<E>>
where
    E: core::fmt::Debug,
{
    let calculated = calculate_crc8(&group[..2]);
    let expected = group[2];

    if calculated == expected {
        Ok(u16::from_be_bytes([group[0], group[1]]))
    } else {
        Err(SensorError::ChecksumMismatch { expected, calculated })
    }
}

/// Builds a `[msb, lsb, crc]` group for a word. Used to stage sensor replies.
#[cfg(test)]
pub(crate) fn encode_word(word: u16) -> [u8; 3] {
    let [msb, lsb] = word.to_be_bytes();
    [msb, lsb, calculate_crc8(&[msb, lsb])]
}
