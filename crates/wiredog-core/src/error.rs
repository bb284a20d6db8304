//! Error types for the wiredog-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for wiredog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all wiredog operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Field tag could not be decoded
    #[error("malformed field tag at offset {offset}: {details}")]
    MalformedTag {
        /// Byte offset where the tag starts
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// A field value extends past the end of the buffer
    #[error(
        "truncated value for field {field_number} at offset {offset}: \
         need {needed} bytes, have {available}"
    )]
    TruncatedValue {
        /// Byte offset where the value starts
        offset: usize,
        /// Field number whose value was being read
        field_number: u64,
        /// Bytes the wire type requires
        needed: usize,
        /// Bytes remaining in the buffer
        available: usize,
    },

    /// Wire type is outside the known set, or a bare end-group marker
    #[error("unsupported wire type {wire_type} for field {field_number} at offset {offset}")]
    UnsupportedWireType {
        /// Byte offset of the offending tag
        offset: usize,
        /// Raw 3-bit wire type value
        wire_type: u8,
        /// Field number carried by the tag
        field_number: u64,
    },

    /// A start-group marker with no matching end-group before buffer end
    #[error("unterminated group for field {field_number}: no matching end-group marker")]
    UnterminatedGroup {
        /// Field number of the open group
        field_number: u64,
    },

    /// Nesting exceeded the configured recursion limit
    #[error("message nesting exceeds the configured depth limit of {limit}")]
    DepthExceeded {
        /// The configured maximum depth
        limit: usize,
    },

    /// No codec is registered under the requested name
    #[error("unsupported format '{name}'")]
    UnknownFormat {
        /// The requested format name
        name: String,
    },

    /// The codec does not support the requested direction
    #[error("codec '{name}' does not support {direction}")]
    CodecUnsupported {
        /// Codec name
        name: &'static str,
        /// Which direction was attempted
        direction: &'static str,
    },

    /// Input was not valid hexadecimal
    #[error("failed to decode hex input: {details}")]
    HexDecode {
        /// Detailed description of the issue
        details: String,
    },

    /// Input was not valid base64
    #[error("failed to decode base64 input: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new malformed tag error
    pub fn malformed_tag(offset: usize, details: impl Into<String>) -> Self {
        Self::MalformedTag {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new truncated value error
    pub fn truncated_value(
        offset: usize,
        field_number: u64,
        needed: usize,
        available: usize,
    ) -> Self {
        Self::TruncatedValue {
            offset,
            field_number,
            needed,
            available,
        }
    }

    /// Creates a new unsupported wire type error
    pub fn unsupported_wire_type(offset: usize, wire_type: u8, field_number: u64) -> Self {
        Self::UnsupportedWireType {
            offset,
            wire_type,
            field_number,
        }
    }

    /// Creates a new unterminated group error
    pub fn unterminated_group(field_number: u64) -> Self {
        Self::UnterminatedGroup { field_number }
    }

    /// Creates a new depth exceeded error
    pub fn depth_exceeded(limit: usize) -> Self {
        Self::DepthExceeded { limit }
    }

    /// Creates a new unknown format error
    pub fn unknown_format(name: impl Into<String>) -> Self {
        Self::UnknownFormat { name: name.into() }
    }

    /// Creates a new hex decode error
    pub fn hex_decode(details: impl Into<String>) -> Self {
        Self::HexDecode {
            details: details.into(),
        }
    }

    /// Returns true if this error describes malformed wire-format input,
    /// as opposed to an I/O or codec configuration problem
    pub fn is_wire_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedTag { .. }
                | Self::TruncatedValue { .. }
                | Self::UnsupportedWireType { .. }
                | Self::UnterminatedGroup { .. }
                | Self::DepthExceeded { .. }
        )
    }
}
