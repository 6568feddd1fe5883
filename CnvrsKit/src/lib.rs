//! # CnvrsKit
//!
//! A pure-Rust library for reading and writing CNVRS text resources: the
//! BINA-container format game engines use to store localized dialogue/UI
//! text together with font and layout metadata.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cnvrskit::formats::cnvrs::{read_cnvrs, write_cnvrs};
//!
//! // Decode a file into the entity model
//! let mut resource = read_cnvrs("text_en.cnvrs")?;
//!
//! // Mutate it
//! if let Some(sheet) = resource.sheets.get_mut("en") {
//!     if let Some(entry) = sheet.entries.get_mut("greeting") {
//!         entry.text = "Hello!".to_owned();
//!     }
//! }
//!
//! // Re-encode, pointer tables and all
//! write_cnvrs("text_en.cnvrs", &resource)?;
//! # Ok::<(), cnvrskit::Error>(())
//! ```
//!
//! ## Custom text codecs
//!
//! Displayed text is a UTF-16-based byte buffer whose inline-markup
//! grammar belongs to the consuming engine. The default
//! [`Utf16Codec`](text::Utf16Codec) handles plain text; engines with
//! control tags implement [`TextCodec`](text::TextCodec) and pass it to
//! `parse_cnvrs_bytes_with` / `serialize_cnvrs_with`.

pub mod error;
pub mod formats;
pub mod io;
pub mod text;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::formats::cnvrs::{
        parse_cnvrs_bytes, read_cnvrs, serialize_cnvrs, write_cnvrs, CnvrsResource, FontEntry,
        LayoutEntry, ParameterEntry, SheetEntry, TextAlignment, TextEntry, TextFit,
        VerticalAlignment,
    };
    pub use crate::text::{normalize, TextCodec, Utf16Codec};
}
