//! Random-access binary I/O primitives
//!
//! Scoped absolute-position reads, null-terminated string I/O, and
//! alignment padding over any `Read + Seek` / `Write + Seek` stream.
//! All multi-byte values in the CNVRS format are little-endian and go
//! through `byteorder` at the call sites.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Result;

/// Scoped random-access reads for seekable streams.
pub trait ReadAt: Read + Seek {
    /// Runs `f` with the stream repositioned to `position`, then restores
    /// the original position regardless of whether `f` succeeded.
    fn read_at<T>(&mut self, position: u64, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.stream_position()?;
        self.seek(SeekFrom::Start(position))?;
        let result = f(self);
        self.seek(SeekFrom::Start(saved))?;
        result
    }

    /// Runs `f` at the current position without consuming anything.
    fn peek<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.stream_position()?;
        let result = f(self);
        self.seek(SeekFrom::Start(saved))?;
        result
    }

    /// Reads UTF-8 bytes up to (and consuming) a single 0 terminator.
    fn read_cstring(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            self.read_exact(&mut byte)?;
            if byte[0] == 0 {
                break;
            }
            bytes.push(byte[0]);
        }
        Ok(String::from_utf8(bytes)?)
    }
}

impl<R: Read + Seek> ReadAt for R {}

/// Null-terminated string output and alignment padding for seekable sinks.
pub trait WriteAt: Write + Seek {
    /// Writes UTF-8 bytes followed by a single 0 terminator.
    fn write_cstring(&mut self, s: &str) -> Result<()> {
        self.write_all(s.as_bytes())?;
        self.write_all(&[0])?;
        Ok(())
    }

    /// Writes zero bytes until the position is a multiple of `alignment`
    /// (a power of two; 4 and 8 in this format).
    fn align(&mut self, alignment: u64) -> Result<()> {
        let position = self.stream_position()?;
        let remainder = position % alignment;
        if remainder != 0 {
            let padding = alignment - remainder;
            for _ in 0..padding {
                self.write_all(&[0])?;
            }
        }
        Ok(())
    }
}

impl<W: Write + Seek> WriteAt for W {}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
    use std::io::Cursor;

    #[test]
    fn test_read_at_restores_position() {
        let data = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut cursor = Cursor::new(data);
        cursor.set_position(2);

        let value = cursor
            .read_at(4, |c| Ok(c.read_u16::<LittleEndian>()?))
            .unwrap();
        assert_eq!(value, 0x0605);
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut cursor = Cursor::new(vec![0xAAu8, 0xBB]);
        let value = cursor.peek(|c| Ok(c.read_u8()?)).unwrap();
        assert_eq!(value, 0xAA);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_cstring_round_trip() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_cstring("hello").unwrap();
        cursor.write_cstring("").unwrap();
        assert_eq!(cursor.get_ref(), b"hello\0\0");

        cursor.set_position(0);
        assert_eq!(cursor.read_cstring().unwrap(), "hello");
        assert_eq!(cursor.read_cstring().unwrap(), "");
    }

    #[test]
    fn test_align_pads_with_zeros() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_u8(0xFF).unwrap();
        cursor.align(4).unwrap();
        assert_eq!(cursor.get_ref(), &[0xFF, 0, 0, 0]);

        // Already aligned: no padding
        cursor.align(4).unwrap();
        assert_eq!(cursor.get_ref().len(), 4);
    }
}
