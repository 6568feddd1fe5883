//! Text payload codecs
//!
//! A CNVRS text payload is a UTF-16-based byte buffer whose inline markup
//! grammar belongs to the consuming engine, not to this crate. The codec
//! seam is [`TextCodec`]: the container reader/writer only ever needs the
//! three operations below. [`Utf16Codec`] is the default, markup-free
//! implementation; engines with control-tag grammars plug in their own.

pub mod normalize;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Encoder/decoder for the displayed-text byte form.
pub trait TextCodec {
    /// Decodes `utf16_len` UTF-16 code units from the current position.
    fn decode(&self, reader: &mut dyn Read, utf16_len: usize) -> Result<String>;

    /// Encodes `text` to its byte form.
    fn encode(&self, writer: &mut dyn Write, text: &str) -> Result<()>;

    /// The encoded length of `text` in bytes, excluding any terminator.
    fn byte_count(&self, text: &str) -> usize;
}

/// Plain little-endian UTF-16 with no inline markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf16Codec;

impl TextCodec for Utf16Codec {
    fn decode(&self, reader: &mut dyn Read, utf16_len: usize) -> Result<String> {
        let mut units = Vec::with_capacity(utf16_len);
        for _ in 0..utf16_len {
            units.push(reader.read_u16::<LittleEndian>()?);
        }
        String::from_utf16(&units).map_err(|_| Error::InvalidUtf16)
    }

    fn encode(&self, writer: &mut dyn Write, text: &str) -> Result<()> {
        for unit in text.encode_utf16() {
            writer.write_u16::<LittleEndian>(unit)?;
        }
        Ok(())
    }

    fn byte_count(&self, text: &str) -> usize {
        text.encode_utf16().count() * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_utf16_round_trip() {
        let codec = Utf16Codec;
        let text = "Héllo 世界 𝄞";

        let mut buffer = Vec::new();
        codec.encode(&mut buffer, text).unwrap();
        assert_eq!(buffer.len(), codec.byte_count(text));

        let decoded = codec
            .decode(&mut Cursor::new(&buffer), buffer.len() / 2)
            .unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_byte_count_counts_surrogate_pairs() {
        let codec = Utf16Codec;
        // U+1D11E is one char but two UTF-16 units
        assert_eq!(codec.byte_count("𝄞"), 4);
        assert_eq!(codec.byte_count("ab"), 4);
    }

    #[test]
    fn test_unpaired_surrogate_fails() {
        let codec = Utf16Codec;
        let bytes = [0x00u8, 0xD8]; // Lone high surrogate
        let err = codec.decode(&mut Cursor::new(&bytes), 1).unwrap_err();
        assert!(matches!(err, Error::InvalidUtf16));
    }
}
