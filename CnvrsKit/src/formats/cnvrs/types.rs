//! In-memory model for CNVRS text resources

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A parsed CNVRS text resource.
///
/// Owns name-keyed collections of sheets, fonts, and layouts. Insertion
/// order is preserved and matters: it drives string-interning order and
/// record emission order, so re-encoding an unmodified resource stays
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CnvrsResource {
    /// Sheets keyed by name (one per language/variant).
    pub sheets: IndexMap<String, SheetEntry>,
    /// Fonts keyed by name. May be referenced by any number of entries.
    pub fonts: IndexMap<String, FontEntry>,
    /// Layouts keyed by name. May be referenced by any number of entries.
    pub layouts: IndexMap<String, LayoutEntry>,
}

impl CnvrsResource {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A named collection of text entries for one language/variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetEntry {
    /// 8-bit language code. When `None`, the writer resolves it from the
    /// sheet name via [`language_code`](super::language_code) and fails
    /// for unrecognized names.
    pub id: Option<u8>,
    /// Text entries keyed by name.
    pub entries: IndexMap<String, TextEntry>,
}

/// One localized text entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextEntry {
    /// Caller-assigned 64-bit id. Engines expect these to be unique
    /// across the file; the codec does not enforce it.
    pub id: u64,
    /// Weak reference into [`CnvrsResource::fonts`], or `None`.
    pub font_name: Option<String>,
    /// Weak reference into [`CnvrsResource::layouts`], or `None`.
    pub layout_name: Option<String>,
    /// Displayed text. Opaque to this crate; the byte form is produced
    /// and consumed by the configured [`TextCodec`](crate::text::TextCodec).
    pub text: String,
    /// Ordered parameter list.
    pub parameters: Vec<ParameterEntry>,
}

/// A key/value parameter attached to a text entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub key: String,
    pub value: String,
    /// Opaque 64-bit value with unknown semantics. Round-trips verbatim.
    pub unknown: u64,
}

/// Font metadata referenced by text entries.
///
/// `size` is always present in the binary form; the remaining scalar
/// fields are independently optional (pointer-or-null encoded).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontEntry {
    pub typeface: String,
    pub size: f32,
    pub line_spacing: Option<f32>,
    /// Shares the `+0x88` value slot with `color`. When both are set the
    /// writer keeps `unknown1` and drops `color`.
    pub unknown1: Option<u32>,
    /// Packed color channels. See `unknown1` for the shared-slot rule.
    pub color: Option<u32>,
    pub unknown2: Option<u32>,
    pub unknown3: Option<u32>,
    pub unknown4: Option<u32>,
}

/// Layout metadata referenced by text entries. All four fields are
/// always present and always written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub text_alignment: TextAlignment,
    pub vertical_alignment: VerticalAlignment,
    pub word_wrap: bool,
    pub fit: TextFit,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justified,
    /// Discriminant outside the known set, preserved verbatim.
    Other(i32),
}

impl TextAlignment {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Left,
            1 => Self::Center,
            2 => Self::Right,
            3 => Self::Justified,
            other => Self::Other(other),
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
            Self::Justified => 3,
            Self::Other(other) => other,
        }
    }
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
    /// Discriminant outside the known set, preserved verbatim.
    Other(i32),
}

impl VerticalAlignment {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Top,
            1 => Self::Center,
            2 => Self::Bottom,
            other => Self::Other(other),
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Top => 0,
            Self::Center => 1,
            Self::Bottom => 2,
            Self::Other(other) => other,
        }
    }
}

/// How text is fitted into its layout box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextFit {
    #[default]
    Normal,
    Shrink,
    /// Discriminant outside the known set, preserved verbatim.
    Other(i32),
}

impl TextFit {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Normal,
            1 => Self::Shrink,
            other => Self::Other(other),
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Shrink => 1,
            Self::Other(other) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_discriminants_round_trip() {
        for value in [0, 1, 2, 3, 7, -1] {
            assert_eq!(TextAlignment::from_i32(value).as_i32(), value);
            assert_eq!(VerticalAlignment::from_i32(value).as_i32(), value);
            assert_eq!(TextFit::from_i32(value).as_i32(), value);
        }
        assert_eq!(TextAlignment::from_i32(7), TextAlignment::Other(7));
    }
}
