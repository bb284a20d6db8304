//! # wiredog-core
//!
//! A library for decoding Protocol Buffer wire format without a schema.
//!
//! Given an arbitrary byte buffer believed to contain a protobuf-encoded
//! message, this crate produces a deterministic, human-readable nested
//! text rendering of its fields, identified by field number only.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`decode`]: Wire format scanning, payload interpretation, rendering
//! - [`codec`]: Named format codecs (raw, hex, base64, protobuf text)
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use wiredog_core::Decoder;
//!
//! // Field 1, varint 150
//! let data = [0x08, 0x96, 0x01];
//!
//! let decoder = Decoder::new();
//! let text = decoder.decode(&data)?;
//! assert_eq!(text, "{\n  1: 150\n}");
//! # Ok::<(), wiredog_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! Input and output transforms implement the [`Codec`] trait and are
//! looked up by name through a [`CodecRegistry`] built at startup.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codec;
pub mod decode;
pub mod error;

// Re-export primary types for convenience
pub use codec::{Base64Codec, Codec, CodecRegistry, HexCodec, ProtobufCodec, RawCodec};
pub use decode::{Decoder, DecoderConfig, WireType, MAX_FIELD_NUMBER};
pub use error::{Error, Result};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
