//! CNVRS text resource format
//!
//! Binary container for localized dialogue/UI text plus font and layout
//! metadata, built on the generic BINA relocatable-container convention
//! (magic, DATA section, name table, relocation table). Every stored
//! pointer is a 64-bit offset relative to the payload base at 0x40.

mod offsets;
mod reader;
mod types;
mod writer;

pub use offsets::{decode_offset_table, encode_offset_table};
pub use reader::{parse_cnvrs_bytes, parse_cnvrs_bytes_with, read_cnvrs};
pub use types::{
    CnvrsResource, FontEntry, LayoutEntry, ParameterEntry, SheetEntry, TextAlignment, TextEntry,
    TextFit, VerticalAlignment,
};
pub use writer::{serialize_cnvrs, serialize_cnvrs_with, write_cnvrs};

/// "BINA210L" magic signature
pub const CNVRS_SIGNATURE: [u8; 8] = *b"BINA210L";

/// Absolute position every stored pointer is relative to
pub const PAYLOAD_BASE: u64 = 64;

/// Size of a sheet header record
pub const SHEET_ENTRY_SIZE: u64 = 0x20;

/// Size of a text entry record
pub const TEXT_ENTRY_SIZE: u64 = 0x30;

/// Size of a font record
pub const FONT_ENTRY_SIZE: u64 = 0xA8;

/// Size of a layout record
pub const LAYOUT_ENTRY_SIZE: u64 = 0x80;

/// Resolve a sheet name to its fixed language-code id.
///
/// Sheets are conventionally named after the language they hold; a sheet
/// with no explicit id must use one of these names.
pub fn language_code(name: &str) -> Option<u8> {
    let id = match name {
        "de" => 0,
        "en" => 1,
        "en(Rough)" => 2, // Never seen in practice but a valid code
        "es" => 3,
        "fr" => 4,
        "it" => 5,
        "ja" => 6,
        "ko" => 7,
        "zh" => 8,
        "zhs" => 9,
        _ => return None,
    };
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!(language_code("de"), Some(0));
        assert_eq!(language_code("fr"), Some(4));
        assert_eq!(language_code("zhs"), Some(9));
        assert_eq!(language_code("xx"), None);
        assert_eq!(language_code("EN"), None);
    }
}
