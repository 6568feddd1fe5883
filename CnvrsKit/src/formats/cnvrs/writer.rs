//! CNVRS file writing and serialization
//!
//! Two-phase emission: an allocation pass lays out every section in
//! fixed order, writing placeholder zeros for pointers whose targets are
//! not yet known and recording their file positions; a patch pass then
//! seeks back and fills in the real payload-relative offsets once every
//! target (including every interned string) has a position. Header
//! fields that depend on the total file length are patched last.

use byteorder::{LittleEndian, WriteBytesExt};
use indexmap::IndexMap;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use super::types::CnvrsResource;
use super::{encode_offset_table, language_code, CNVRS_SIGNATURE, PAYLOAD_BASE};
use crate::error::{Error, Result};
use crate::io::WriteAt;
use crate::text::{TextCodec, Utf16Codec};

type Output = Cursor<Vec<u8>>;

/// Positions allocated for one sheet and its text entries.
#[derive(Default)]
struct SheetNode {
    entry_position: u64,
    text_start_position: u64,
    texts: Vec<TextNode>,
}

/// Positions allocated for one text entry's records.
#[derive(Default)]
struct TextNode {
    entry_position: u64,
    secondary_position: u64,
    text_position: u64,
    parameter_header_position: u64,
    parameter_list_position: u64,
    parameter_positions: Vec<u64>,
}

/// Serialization context: the relocation list (every pointer-field
/// position, in physical write order) and the string-interning table
/// (first-write-wins, keyed by exact string value).
#[derive(Default)]
struct WriteContext {
    offsets: Vec<u64>,
    names: IndexMap<String, u64>,
}

impl WriteContext {
    /// Writes a relocatable 64-bit offset field, recording its position.
    fn write_offset(&mut self, cursor: &mut Output, value: i64) -> Result<()> {
        self.offsets.push(cursor.position());
        cursor.write_i64::<LittleEndian>(value)?;
        Ok(())
    }

    /// Writes an optional self-referential value pointer: the fixed
    /// target when the value is present, a plain (non-relocatable) null
    /// otherwise.
    fn write_value_pointer(
        &mut self,
        cursor: &mut Output,
        present: bool,
        target: u64,
    ) -> Result<()> {
        if present {
            self.write_offset(cursor, (target - PAYLOAD_BASE) as i64)
        } else {
            cursor.write_i64::<LittleEndian>(0)?;
            Ok(())
        }
    }

    /// Interns a string: first occurrence is written to the name table,
    /// later occurrences reuse the recorded absolute position.
    fn intern(&mut self, cursor: &mut Output, value: &str) -> Result<()> {
        if !self.names.contains_key(value) {
            self.names.insert(value.to_owned(), cursor.position());
            cursor.write_cstring(value)?;
        }
        Ok(())
    }

    /// Absolute position of an interned string, as a payload-relative
    /// offset. Only valid after the name table has been emitted.
    fn name_offset(&self, value: &str) -> i64 {
        (self.names[value] - PAYLOAD_BASE) as i64
    }
}

/// Write a CNVRS file to disk using the default UTF-16 text codec.
///
/// Serialization happens entirely in memory; the file is only created
/// once the byte image is complete, so a failed write leaves nothing
/// behind.
///
/// # Errors
///
/// Returns [`Error::UnresolvedLanguage`] if a sheet without an explicit
/// id is not named after a recognized language code, and [`Error::Io`]
/// if the file cannot be written.
///
/// [`Error::UnresolvedLanguage`]: crate::Error::UnresolvedLanguage
/// [`Error::Io`]: crate::Error::Io
pub fn write_cnvrs<P: AsRef<Path>>(path: P, resource: &CnvrsResource) -> Result<()> {
    let bytes = serialize_cnvrs(resource)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize a CNVRS resource to bytes using the default UTF-16 codec.
pub fn serialize_cnvrs(resource: &CnvrsResource) -> Result<Vec<u8>> {
    serialize_cnvrs_with(resource, &Utf16Codec)
}

/// Serialize a CNVRS resource to bytes with a caller-supplied text codec.
pub fn serialize_cnvrs_with(resource: &CnvrsResource, codec: &dyn TextCodec) -> Result<Vec<u8>> {
    // Resolve sheet ids up front so an unresolvable name fails before any
    // output exists
    let mut sheet_ids = Vec::with_capacity(resource.sheets.len());
    for (name, sheet) in &resource.sheets {
        let id = match sheet.id {
            Some(id) => id,
            None => language_code(name)
                .ok_or_else(|| Error::UnresolvedLanguage(name.clone()))?,
        };
        sheet_ids.push(id);
    }

    tracing::debug!(
        sheets = resource.sheets.len(),
        fonts = resource.fonts.len(),
        layouts = resource.layouts.len(),
        "serializing CNVRS resource"
    );

    let mut cursor = Cursor::new(Vec::new());
    let mut ctx = WriteContext::default();

    // BINA header
    cursor.write_all(&CNVRS_SIGNATURE)?;
    cursor.write_u32::<LittleEndian>(0)?; // File length (patched last)
    cursor.write_u32::<LittleEndian>(1)?; // Section count

    // DATA section header
    cursor.write_all(b"DATA")?;
    cursor.write_u32::<LittleEndian>(0)?; // Section length (patched last)
    cursor.write_u32::<LittleEndian>(0)?; // Name table offset (patched last)
    cursor.write_u32::<LittleEndian>(0)?; // Name table length (patched last)
    cursor.write_u32::<LittleEndian>(0)?; // Offset table length (patched last)
    cursor.write_u32::<LittleEndian>(24)?;
    cursor.write_all(&[0u8; 24])?;

    // Sheet headers
    let mut sheet_nodes = Vec::with_capacity(resource.sheets.len());
    for (sheet, &id) in resource.sheets.values().zip(&sheet_ids) {
        let mut node = SheetNode {
            entry_position: cursor.position(),
            ..SheetNode::default()
        };
        node.texts.reserve(sheet.entries.len());
        sheet_nodes.push(node);

        cursor.write_u8(6)?; // Record tag
        cursor.write_u8(id)?;
        cursor.write_i16::<LittleEndian>(sheet.entries.len() as i16)?;
        cursor.write_i32::<LittleEndian>(0)?;
        ctx.write_offset(&mut cursor, 0)?; // Text entry array (patched)
        ctx.write_offset(&mut cursor, 0)?; // Sheet name (patched)
        cursor.write_i64::<LittleEndian>(0)?;
    }

    // Text entry arrays, per sheet
    for (sheet, node) in resource.sheets.values().zip(&mut sheet_nodes) {
        node.text_start_position = cursor.position();

        for text in sheet.entries.values() {
            node.texts.push(TextNode {
                entry_position: cursor.position(),
                ..TextNode::default()
            });

            cursor.write_u64::<LittleEndian>(text.id)?;
            ctx.write_offset(&mut cursor, 0)?; // Entry name (patched)
            ctx.write_offset(&mut cursor, 0)?; // Secondary record (patched)
            ctx.write_offset(&mut cursor, 0)?; // Text payload (patched)
            cursor.write_i64::<LittleEndian>((codec.byte_count(&text.text) / 2) as i64)?;
            if text.parameters.is_empty() {
                // Not relocatable when there is no parameter list
                cursor.write_u64::<LittleEndian>(0)?;
            } else {
                ctx.write_offset(&mut cursor, 0)?; // Parameter header (patched)
            }
        }
    }

    // Text payloads
    for (sheet, node) in resource.sheets.values().zip(&mut sheet_nodes) {
        for (text, text_node) in sheet.entries.values().zip(&mut node.texts) {
            text_node.text_position = cursor.position();
            codec.encode(&mut cursor, &text.text)?;
            cursor.write_u16::<LittleEndian>(0)?; // UTF-16 null terminator
            cursor.align(8)?;
        }
    }

    // Secondary records
    for (sheet, node) in resource.sheets.values().zip(&mut sheet_nodes) {
        for text_node in &mut node.texts {
            text_node.secondary_position = cursor.position();
            ctx.write_offset(&mut cursor, 0)?; // Entry name (patched)
            ctx.write_offset(&mut cursor, 0)?; // Font record (patched)
            ctx.write_offset(&mut cursor, 0)?; // Layout record (patched)
            cursor.write_i64::<LittleEndian>(0)?;
        }
        debug_assert_eq!(node.texts.len(), sheet.entries.len());
    }

    // Font records. Optional scalars use self-referential pointers into
    // the value block at the end of the same record; absent values get a
    // null pointer and a zero slot.
    let mut font_positions = IndexMap::with_capacity(resource.fonts.len());
    for (name, font) in &resource.fonts {
        let entry = cursor.position();
        font_positions.insert(name.clone(), entry);

        ctx.write_offset(&mut cursor, 0)?; // Font name (patched)
        ctx.write_offset(&mut cursor, 0)?; // Typeface name (patched)
        ctx.write_offset(&mut cursor, (entry + 0x78 - PAYLOAD_BASE) as i64)?; // Size
        ctx.write_value_pointer(&mut cursor, font.line_spacing.is_some(), entry + 0x80)?;
        ctx.write_value_pointer(&mut cursor, font.unknown1.is_some(), entry + 0x88)?;
        // unknown1 and color share the +0x88 slot; unknown1 wins
        ctx.write_value_pointer(
            &mut cursor,
            font.color.is_some() && font.unknown1.is_none(),
            entry + 0x88,
        )?;
        ctx.write_value_pointer(&mut cursor, font.unknown2.is_some(), entry + 0x90)?;
        cursor.write_i64::<LittleEndian>(0)?;
        ctx.write_value_pointer(&mut cursor, font.unknown3.is_some(), entry + 0xA0)?;
        cursor.write_i64::<LittleEndian>(0)?;
        cursor.write_i64::<LittleEndian>(0)?;
        cursor.write_i64::<LittleEndian>(0)?;
        ctx.write_value_pointer(&mut cursor, font.unknown4.is_some(), entry + 0x98)?;
        cursor.write_i64::<LittleEndian>(0)?;
        cursor.write_i64::<LittleEndian>(0)?;

        // Value block (+0x78)
        cursor.write_f32::<LittleEndian>(font.size)?;
        cursor.write_i32::<LittleEndian>(0)?;
        cursor.write_f32::<LittleEndian>(font.line_spacing.unwrap_or(0.0))?;
        cursor.write_i32::<LittleEndian>(0)?;
        cursor.write_u32::<LittleEndian>(font.unknown1.or(font.color).unwrap_or(0))?;
        cursor.write_i32::<LittleEndian>(0)?;
        cursor.write_u32::<LittleEndian>(font.unknown2.unwrap_or(0))?;
        cursor.write_i32::<LittleEndian>(0)?;
        cursor.write_u32::<LittleEndian>(font.unknown4.unwrap_or(0))?;
        cursor.write_i32::<LittleEndian>(0)?;
        cursor.write_u32::<LittleEndian>(font.unknown3.unwrap_or(0))?;
        cursor.write_i32::<LittleEndian>(0)?;
    }

    // Layout records. All four values are always present, so the value
    // pointers always carry their fixed targets.
    let mut layout_positions = IndexMap::with_capacity(resource.layouts.len());
    for (name, layout) in &resource.layouts {
        let entry = cursor.position();
        layout_positions.insert(name.clone(), entry);

        ctx.write_offset(&mut cursor, 0)?; // Layout name (patched)
        cursor.write_all(&[0u8; 24])?;
        ctx.write_offset(&mut cursor, (entry + 0x60 - PAYLOAD_BASE) as i64)?; // Text alignment
        ctx.write_offset(&mut cursor, (entry + 0x68 - PAYLOAD_BASE) as i64)?; // Vertical alignment
        ctx.write_offset(&mut cursor, (entry + 0x70 - PAYLOAD_BASE) as i64)?; // Word wrap
        ctx.write_offset(&mut cursor, (entry + 0x78 - PAYLOAD_BASE) as i64)?; // Fit
        cursor.write_all(&[0u8; 32])?;

        // Value block (+0x60)
        cursor.write_i32::<LittleEndian>(layout.text_alignment.as_i32())?;
        cursor.write_i32::<LittleEndian>(0)?;
        cursor.write_i32::<LittleEndian>(layout.vertical_alignment.as_i32())?;
        cursor.write_i32::<LittleEndian>(0)?;
        cursor.write_i32::<LittleEndian>(i32::from(layout.word_wrap))?;
        cursor.write_i32::<LittleEndian>(0)?;
        cursor.write_i32::<LittleEndian>(layout.fit.as_i32())?;
        cursor.write_i32::<LittleEndian>(0)?;
    }

    // Parameter list headers, only for entries that have parameters
    for (sheet, node) in resource.sheets.values().zip(&mut sheet_nodes) {
        for (text, text_node) in sheet.entries.values().zip(&mut node.texts) {
            if text.parameters.is_empty() {
                continue;
            }
            text_node.parameter_header_position = cursor.position();
            cursor.write_i64::<LittleEndian>(text.parameters.len() as i64)?;
            ctx.write_offset(&mut cursor, 0)?; // Pointer array (patched)
        }
    }

    // Parameter pointer arrays
    for (sheet, node) in resource.sheets.values().zip(&mut sheet_nodes) {
        for (text, text_node) in sheet.entries.values().zip(&mut node.texts) {
            if text.parameters.is_empty() {
                continue;
            }
            text_node.parameter_list_position = cursor.position();
            for _ in &text.parameters {
                ctx.write_offset(&mut cursor, 0)?; // Parameter record (patched)
            }
        }
    }

    // Parameter data records
    for (sheet, node) in resource.sheets.values().zip(&mut sheet_nodes) {
        for (text, text_node) in sheet.entries.values().zip(&mut node.texts) {
            for parameter in &text.parameters {
                text_node.parameter_positions.push(cursor.position());
                ctx.write_offset(&mut cursor, 0)?; // Key string (patched)
                cursor.write_u64::<LittleEndian>(parameter.unknown)?;
                ctx.write_offset(&mut cursor, 0)?; // Value string (patched)
            }
        }
    }

    // Name table: interned in traversal order, first occurrence wins
    let name_table_position = cursor.position();
    for (sheet_name, sheet) in &resource.sheets {
        ctx.intern(&mut cursor, sheet_name)?;
        for text_name in sheet.entries.keys() {
            ctx.intern(&mut cursor, text_name)?;
        }
        for text in sheet.entries.values() {
            for parameter in &text.parameters {
                ctx.intern(&mut cursor, &parameter.key)?;
                ctx.intern(&mut cursor, &parameter.value)?;
            }
        }
    }
    for (name, font) in &resource.fonts {
        ctx.intern(&mut cursor, name)?;
        ctx.intern(&mut cursor, &font.typeface)?;
    }
    for name in resource.layouts.keys() {
        ctx.intern(&mut cursor, name)?;
    }
    cursor.align(4)?;

    // Relocation table, in phase-1 emission order
    let offset_table_position = cursor.position();
    encode_offset_table(&mut cursor, &ctx.offsets)?;
    cursor.align(4)?;

    // Patch pass: everything now has a position
    let total_length = cursor.get_ref().len() as u32;

    cursor.seek(SeekFrom::Start(0x08))?;
    cursor.write_u32::<LittleEndian>(total_length)?;

    cursor.seek(SeekFrom::Start(0x14))?;
    cursor.write_u32::<LittleEndian>(total_length - 16)?;
    cursor.write_u32::<LittleEndian>((name_table_position - PAYLOAD_BASE) as u32)?;
    cursor.write_u32::<LittleEndian>((offset_table_position - name_table_position) as u32)?;
    cursor.write_u32::<LittleEndian>(total_length - offset_table_position as u32)?;

    for ((sheet_name, sheet), node) in resource.sheets.iter().zip(&sheet_nodes) {
        cursor.seek(SeekFrom::Start(node.entry_position + 0x08))?;
        cursor.write_i64::<LittleEndian>((node.text_start_position - PAYLOAD_BASE) as i64)?;
        cursor.write_i64::<LittleEndian>(ctx.name_offset(sheet_name))?;

        for ((text_name, text), text_node) in sheet.entries.iter().zip(&node.texts) {
            cursor.seek(SeekFrom::Start(text_node.entry_position + 0x08))?;
            cursor.write_i64::<LittleEndian>(ctx.name_offset(text_name))?;
            cursor
                .write_i64::<LittleEndian>((text_node.secondary_position - PAYLOAD_BASE) as i64)?;
            cursor.write_i64::<LittleEndian>((text_node.text_position - PAYLOAD_BASE) as i64)?;

            if !text.parameters.is_empty() {
                cursor.seek(SeekFrom::Start(text_node.entry_position + 0x28))?;
                cursor.write_i64::<LittleEndian>(
                    (text_node.parameter_header_position - PAYLOAD_BASE) as i64,
                )?;
            }

            cursor.seek(SeekFrom::Start(text_node.secondary_position))?;
            cursor.write_i64::<LittleEndian>(ctx.name_offset(text_name))?;
            cursor.write_i64::<LittleEndian>(resolve_reference(
                text.font_name.as_deref(),
                &font_positions,
                text_name,
                "font",
            ))?;
            cursor.write_i64::<LittleEndian>(resolve_reference(
                text.layout_name.as_deref(),
                &layout_positions,
                text_name,
                "layout",
            ))?;
        }
    }

    for (name, font) in &resource.fonts {
        cursor.seek(SeekFrom::Start(font_positions[name]))?;
        cursor.write_i64::<LittleEndian>(ctx.name_offset(name))?;
        cursor.write_i64::<LittleEndian>(ctx.name_offset(&font.typeface))?;
    }

    for name in resource.layouts.keys() {
        cursor.seek(SeekFrom::Start(layout_positions[name]))?;
        cursor.write_i64::<LittleEndian>(ctx.name_offset(name))?;
    }

    for (sheet, node) in resource.sheets.values().zip(&sheet_nodes) {
        for (text, text_node) in sheet.entries.values().zip(&node.texts) {
            if text.parameters.is_empty() {
                continue;
            }

            cursor.seek(SeekFrom::Start(text_node.parameter_header_position + 0x08))?;
            cursor.write_i64::<LittleEndian>(
                (text_node.parameter_list_position - PAYLOAD_BASE) as i64,
            )?;

            cursor.seek(SeekFrom::Start(text_node.parameter_list_position))?;
            for &record in &text_node.parameter_positions {
                cursor.write_i64::<LittleEndian>((record - PAYLOAD_BASE) as i64)?;
            }

            for (parameter, &record) in text.parameters.iter().zip(&text_node.parameter_positions)
            {
                cursor.seek(SeekFrom::Start(record))?;
                cursor.write_i64::<LittleEndian>(ctx.name_offset(&parameter.key))?;
                cursor.seek(SeekFrom::Start(record + 0x10))?;
                cursor.write_i64::<LittleEndian>(ctx.name_offset(&parameter.value))?;
            }
        }
    }

    Ok(cursor.into_inner())
}

/// Resolves a weak font/layout name reference to a payload-relative
/// offset. A reference to a name absent from the map degrades to a null
/// pointer rather than failing, but is logged.
fn resolve_reference(
    name: Option<&str>,
    positions: &IndexMap<String, u64>,
    entry_name: &str,
    kind: &str,
) -> i64 {
    match name {
        Some(name) => match positions.get(name) {
            Some(&position) => (position - PAYLOAD_BASE) as i64,
            None => {
                tracing::warn!(entry = entry_name, name, "dropping dangling {kind} reference");
                0
            }
        },
        None => 0,
    }
}
