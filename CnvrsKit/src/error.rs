//! Error types for `cnvrskit`

use thiserror::Error;

/// The error type for `cnvrskit` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== CNVRS Format Errors ====================
    /// The file is not a valid CNVRS text resource (missing BINA signature).
    #[error("invalid CNVRS magic: expected BINA210L, found {0:?}")]
    InvalidCnvrsMagic([u8; 8]),

    /// The length stored in the header does not match the actual byte count.
    #[error("file length mismatch: header says {expected} bytes, input is {actual} bytes")]
    LengthMismatch {
        /// The length recorded in the file header.
        expected: u32,
        /// The actual length of the input.
        actual: u64,
    },

    /// A mandatory pointer field resolved to offset 0.
    #[error("missing required value: null pointer at {position:#x}")]
    MissingValue {
        /// The file position of the pointer field.
        position: u64,
    },

    /// A sheet with no explicit id has a name outside the language-code table.
    #[error("sheet name is not a recognized language code: {0}")]
    UnresolvedLanguage(String),

    // ==================== Relocation Table Errors ====================
    /// A pointer-field position is not 4-byte aligned.
    #[error("pointer field position not 4-byte aligned: {0:#x}")]
    MisalignedOffset(u64),

    /// The delta between two pointer-field positions exceeds the encodable range.
    #[error("offset delta too large for relocation table: {0:#x}")]
    OffsetDeltaTooLarge(u64),

    /// The relocation table contains a byte with an invalid width prefix.
    #[error("invalid relocation table code: {0:#04x}")]
    InvalidOffsetCode(u8),

    // ==================== Text Errors ====================
    /// A text payload contained an unpaired UTF-16 surrogate.
    #[error("invalid UTF-16 in text payload")]
    InvalidUtf16,

    /// A string in the name table was not valid UTF-8.
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

/// A specialized Result type for `cnvrskit` operations.
pub type Result<T> = std::result::Result<T, Error>;
