//! Relocation (offset) table codec
//!
//! The tail of a CNVRS file lists the file position of every relocatable
//! 64-bit pointer field, stored as variable-width deltas between
//! successive positions. The first delta is taken against the payload
//! base at 0x40. A consuming loader walks this list to patch stored
//! relative offsets into real addresses.
//!
//! Each delta is divided by 4 (pointer fields are 4-byte aligned by
//! construction) and encoded by its magnitude, selected by the top two
//! bits of the lead byte:
//!
//! | top bits | width | payload |
//! |----------|-------|---------|
//! | `01`     | 1     | 6 bits  |
//! | `10`     | 2     | 14 bits, big-endian bit pattern |
//! | `11`     | 4     | 30 bits, big-endian bit pattern |

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

use super::PAYLOAD_BASE;
use crate::error::{Error, Result};

/// Encode the positions of all relocatable pointer fields.
///
/// `positions` must be in ascending physical-offset order, exactly the
/// order the fields were written. Fails on a misaligned position or a
/// delta above the 30-bit limit.
pub fn encode_offset_table<W: Write>(writer: &mut W, positions: &[u64]) -> Result<()> {
    let mut previous = PAYLOAD_BASE;
    for &position in positions {
        let byte_delta = position.wrapping_sub(previous);
        if byte_delta % 4 != 0 {
            return Err(Error::MisalignedOffset(position));
        }
        let delta = byte_delta >> 2;

        if delta <= 0x3F {
            writer.write_u8(0x40 | delta as u8)?;
        } else if delta <= 0x3FFF {
            writer.write_u16::<BigEndian>(0x8000 | delta as u16)?;
        } else if delta <= 0x3FFFFFFF {
            writer.write_u32::<BigEndian>(0xC0000000 | delta as u32)?;
        } else {
            return Err(Error::OffsetDeltaTooLarge(byte_delta));
        }

        previous = position;
    }
    Ok(())
}

/// Decode an offset table back into absolute pointer-field positions.
///
/// A `00`-prefixed byte ends the table: writers pad it to a 4-byte
/// boundary with zeros, so trailing zero bytes are expected.
pub fn decode_offset_table(data: &[u8]) -> Result<Vec<u64>> {
    let mut cursor = Cursor::new(data);
    let mut positions = Vec::new();
    let mut previous = PAYLOAD_BASE;

    while (cursor.position() as usize) < data.len() {
        let lead = cursor.read_u8()?;
        let delta = match lead >> 6 {
            0b00 => {
                if lead == 0 {
                    break; // Alignment padding
                }
                return Err(Error::InvalidOffsetCode(lead));
            }
            0b01 => u64::from(lead & 0x3F),
            0b10 => {
                let second = cursor.read_u8()?;
                (u64::from(lead & 0x3F) << 8) | u64::from(second)
            }
            _ => {
                let mut rest = [0u8; 3];
                std::io::Read::read_exact(&mut cursor, &mut rest)?;
                (u64::from(lead & 0x3F) << 24)
                    | (u64::from(rest[0]) << 16)
                    | (u64::from(rest[1]) << 8)
                    | u64::from(rest[2])
            }
        };

        previous += delta << 2;
        positions.push(previous);
    }

    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(deltas: &[u64]) -> Vec<u8> {
        // Build positions from deltas (in pointer-field units of 4 bytes)
        let mut positions = Vec::new();
        let mut current = PAYLOAD_BASE;
        for &delta in deltas {
            current += delta * 4;
            positions.push(current);
        }

        let mut encoded = Vec::new();
        encode_offset_table(&mut encoded, &positions).unwrap();
        assert_eq!(decode_offset_table(&encoded).unwrap(), positions);
        encoded
    }

    #[test]
    fn test_delta_thresholds() {
        // Each delta alone, checking the encoded width
        assert_eq!(round_trip(&[0]).len(), 1);
        assert_eq!(round_trip(&[1]).len(), 1);
        assert_eq!(round_trip(&[0x3F]).len(), 1);
        assert_eq!(round_trip(&[0x40]).len(), 2);
        assert_eq!(round_trip(&[0x3FFF]).len(), 2);
        assert_eq!(round_trip(&[0x4000]).len(), 4);
        assert_eq!(round_trip(&[0x3FFFFFFF]).len(), 4);
    }

    #[test]
    fn test_mixed_widths() {
        let encoded = round_trip(&[1, 0x40, 0x4000, 2]);
        assert_eq!(encoded.len(), 1 + 2 + 4 + 1);
    }

    #[test]
    fn test_known_encodings() {
        // First field right at the payload base: delta 0
        let mut encoded = Vec::new();
        encode_offset_table(&mut encoded, &[64, 72]).unwrap();
        assert_eq!(encoded, vec![0x40, 0x42]);
    }

    #[test]
    fn test_misaligned_position_fails() {
        let mut sink = Vec::new();
        let err = encode_offset_table(&mut sink, &[66]).unwrap_err();
        assert!(matches!(err, Error::MisalignedOffset(66)));
    }

    #[test]
    fn test_delta_too_large_fails() {
        let mut sink = Vec::new();
        let err = encode_offset_table(&mut sink, &[PAYLOAD_BASE + 0x40000000 * 4]).unwrap_err();
        assert!(matches!(err, Error::OffsetDeltaTooLarge(_)));
    }

    #[test]
    fn test_trailing_padding_ignored() {
        let positions = decode_offset_table(&[0x41, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(positions, vec![68]);
    }

    #[test]
    fn test_invalid_code_fails() {
        let err = decode_offset_table(&[0x3F]).unwrap_err();
        assert!(matches!(err, Error::InvalidOffsetCode(0x3F)));
    }
}
