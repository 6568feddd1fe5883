//! CNVRS file reading and parsing
//!
//! Single-pass decode of one sheet (plus its fonts, layouts, and
//! parameters) into a [`CnvrsResource`]. Files holding more than one
//! sheet are not supported on read.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Seek, SeekFrom};
use std::path::Path;

use super::types::{
    CnvrsResource, FontEntry, LayoutEntry, ParameterEntry, SheetEntry, TextAlignment, TextEntry,
    TextFit, VerticalAlignment,
};
use super::{CNVRS_SIGNATURE, PAYLOAD_BASE, TEXT_ENTRY_SIZE};
use crate::error::{Error, Result};
use crate::io::ReadAt;
use crate::text::{TextCodec, Utf16Codec};

type Input<'a> = Cursor<&'a [u8]>;

/// Read a CNVRS file from disk using the default UTF-16 text codec.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened or read.
/// Returns [`Error::InvalidCnvrsMagic`] or [`Error::LengthMismatch`] if
/// the file is not a valid CNVRS text resource.
///
/// [`Error::Io`]: crate::Error::Io
/// [`Error::InvalidCnvrsMagic`]: crate::Error::InvalidCnvrsMagic
/// [`Error::LengthMismatch`]: crate::Error::LengthMismatch
pub fn read_cnvrs<P: AsRef<Path>>(path: P) -> Result<CnvrsResource> {
    let data = std::fs::read(path)?;
    parse_cnvrs_bytes(&data)
}

/// Parse CNVRS data from bytes using the default UTF-16 text codec.
pub fn parse_cnvrs_bytes(data: &[u8]) -> Result<CnvrsResource> {
    parse_cnvrs_bytes_with(data, &Utf16Codec)
}

/// Parse CNVRS data from bytes with a caller-supplied text codec.
///
/// # Errors
///
/// Returns [`Error::InvalidCnvrsMagic`] if the data does not start with
/// the BINA signature, [`Error::LengthMismatch`] if the header length
/// field disagrees with the input length, and [`Error::MissingValue`] if
/// a mandatory pointer field is null.
///
/// [`Error::InvalidCnvrsMagic`]: crate::Error::InvalidCnvrsMagic
/// [`Error::LengthMismatch`]: crate::Error::LengthMismatch
/// [`Error::MissingValue`]: crate::Error::MissingValue
pub fn parse_cnvrs_bytes_with(data: &[u8], codec: &dyn TextCodec) -> Result<CnvrsResource> {
    let mut cursor = Cursor::new(data);

    let mut magic = [0u8; 8];
    std::io::Read::read_exact(&mut cursor, &mut magic)?;
    if magic != CNVRS_SIGNATURE {
        return Err(Error::InvalidCnvrsMagic(magic));
    }

    // The u32 at 0x08 is the expected file size
    let expected = cursor.peek(|c| Ok(c.read_u32::<LittleEndian>()?))?;
    if u64::from(expected) != data.len() as u64 {
        return Err(Error::LengthMismatch {
            expected,
            actual: data.len() as u64,
        });
    }

    let mut resource = CnvrsResource::new();

    // One sheet per file is assumed
    cursor.set_position(0x41);
    let sheet_id = cursor.read_u8()?;
    let text_count = cursor.read_i16::<LittleEndian>()?;

    cursor.set_position(0x50);
    let sheet_name = read_at_offset_or_err(&mut cursor, |c| c.read_cstring())?;
    tracing::debug!(sheet = %sheet_name, entries = text_count, "parsing CNVRS sheet");

    let mut sheet = SheetEntry {
        id: Some(sheet_id),
        entries: indexmap::IndexMap::with_capacity(text_count.max(0) as usize),
    };

    for i in 0..text_count.max(0) as u64 {
        cursor.set_position(0x60 + i * TEXT_ENTRY_SIZE);

        let entry_id = cursor.read_u64::<LittleEndian>()?;
        let entry_name = read_at_offset_or_err(&mut cursor, |c| c.read_cstring())?;
        let secondary_offset = read_offset_or_err(&mut cursor)?;
        let text_position = read_offset_or_err(&mut cursor)?;
        // Text length is stored in UTF-16 code units
        let text_length = cursor.read_i64::<LittleEndian>()?;
        let parameters_offset = cursor.read_i64::<LittleEndian>()?;

        let text =
            cursor.read_at(text_position, |c| codec.decode(c, text_length.max(0) as usize))?;

        // Secondary record: discarded field, font pointer, layout pointer
        cursor.set_position(secondary_offset);
        cursor.read_i64::<LittleEndian>()?;
        let font_offset = cursor.read_i64::<LittleEndian>()?;
        let layout_offset = cursor.read_i64::<LittleEndian>()?;

        let font_name = if font_offset == 0 {
            None
        } else {
            Some(read_font(
                &mut cursor,
                &mut resource,
                font_offset as u64 + PAYLOAD_BASE,
            )?)
        };

        let layout_name = if layout_offset == 0 {
            None
        } else {
            Some(read_layout(
                &mut cursor,
                &mut resource,
                layout_offset as u64 + PAYLOAD_BASE,
            )?)
        };

        let mut parameters = Vec::new();
        if parameters_offset != 0 {
            cursor.set_position(parameters_offset as u64 + PAYLOAD_BASE);
            let count = cursor.read_i64::<LittleEndian>()?;
            let list_position = cursor.read_i64::<LittleEndian>()? as u64 + PAYLOAD_BASE;

            cursor.set_position(list_position);
            for _ in 0..count {
                let record_position = cursor.read_i64::<LittleEndian>()? as u64 + PAYLOAD_BASE;
                let parameter = cursor.read_at(record_position, |c| {
                    let key = read_at_offset_or_err(c, |c| c.read_cstring())?;
                    let unknown = c.read_u64::<LittleEndian>()?;
                    let value = read_at_offset_or_err(c, |c| c.read_cstring())?;
                    Ok(ParameterEntry {
                        key,
                        value,
                        unknown,
                    })
                })?;
                parameters.push(parameter);
            }
        }

        sheet.entries.insert(
            entry_name,
            TextEntry {
                id: entry_id,
                font_name,
                layout_name,
                text,
                parameters,
            },
        );
    }

    resource.sheets.insert(sheet_name, sheet);
    Ok(resource)
}

/// Reads a font record, caching it by name. A record already decoded into
/// the resource's map is not re-parsed, since many entries commonly point
/// at the same font.
fn read_font(cursor: &mut Input, resource: &mut CnvrsResource, position: u64) -> Result<String> {
    cursor.set_position(position);

    let name = read_at_offset_or_err(cursor, |c| c.read_cstring())?;
    if resource.fonts.contains_key(&name) {
        return Ok(name);
    }

    let typeface = read_at_offset_or_err(cursor, |c| c.read_cstring())?;
    let size = read_at_offset(cursor, |c| Ok(c.read_f32::<LittleEndian>()?))?.unwrap_or(0.0);
    let line_spacing = read_at_offset(cursor, |c| Ok(c.read_f32::<LittleEndian>()?))?;
    let unknown1 = read_at_offset(cursor, |c| Ok(c.read_u32::<LittleEndian>()?))?;
    let color = read_at_offset(cursor, |c| Ok(c.read_u32::<LittleEndian>()?))?;
    let unknown2 = read_at_offset(cursor, |c| Ok(c.read_u32::<LittleEndian>()?))?;
    cursor.seek(SeekFrom::Current(8))?;
    let unknown3 = read_at_offset(cursor, |c| Ok(c.read_u32::<LittleEndian>()?))?;
    cursor.seek(SeekFrom::Current(24))?;
    let unknown4 = read_at_offset(cursor, |c| Ok(c.read_u32::<LittleEndian>()?))?;

    resource.fonts.insert(
        name.clone(),
        FontEntry {
            typeface,
            size,
            line_spacing,
            unknown1,
            color,
            unknown2,
            unknown3,
            unknown4,
        },
    );

    Ok(name)
}

/// Reads a layout record, caching it by name like [`read_font`].
fn read_layout(cursor: &mut Input, resource: &mut CnvrsResource, position: u64) -> Result<String> {
    cursor.set_position(position);

    let name = read_at_offset_or_err(cursor, |c| c.read_cstring())?;
    if resource.layouts.contains_key(&name) {
        return Ok(name);
    }

    cursor.seek(SeekFrom::Current(24))?;

    let text_alignment = read_at_offset(cursor, |c| Ok(c.read_i32::<LittleEndian>()?))?;
    let vertical_alignment = read_at_offset(cursor, |c| Ok(c.read_i32::<LittleEndian>()?))?;
    let word_wrap = read_at_offset(cursor, |c| Ok(c.read_i32::<LittleEndian>()?))?;
    let fit = read_at_offset(cursor, |c| Ok(c.read_i32::<LittleEndian>()?))?;

    resource.layouts.insert(
        name.clone(),
        LayoutEntry {
            text_alignment: TextAlignment::from_i32(text_alignment.unwrap_or(0)),
            vertical_alignment: VerticalAlignment::from_i32(vertical_alignment.unwrap_or(0)),
            word_wrap: word_wrap.unwrap_or(0) == 1,
            fit: TextFit::from_i32(fit.unwrap_or(0)),
        },
    );

    Ok(name)
}

/// Reads a relative pointer field and dereferences it, returning `None`
/// for a null pointer. The stream is left just past the pointer field.
fn read_at_offset<T>(
    cursor: &mut Input,
    f: impl FnOnce(&mut Input) -> Result<T>,
) -> Result<Option<T>> {
    let offset = cursor.read_i64::<LittleEndian>()?;
    if offset == 0 {
        return Ok(None);
    }
    cursor.read_at(offset as u64 + PAYLOAD_BASE, f).map(Some)
}

/// Like [`read_at_offset`], for fields where a null pointer is malformed.
fn read_at_offset_or_err<T>(
    cursor: &mut Input,
    f: impl FnOnce(&mut Input) -> Result<T>,
) -> Result<T> {
    let position = cursor.position();
    read_at_offset(cursor, f)?.ok_or(Error::MissingValue { position })
}

/// Reads a mandatory relative pointer field without dereferencing it.
fn read_offset_or_err(cursor: &mut Input) -> Result<u64> {
    let position = cursor.position();
    let offset = cursor.read_i64::<LittleEndian>()?;
    if offset == 0 {
        return Err(Error::MissingValue { position });
    }
    Ok(offset as u64 + PAYLOAD_BASE)
}
