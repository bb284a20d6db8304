//! Format codecs for message payloads.
//!
//! A [`Codec`] converts between an external representation of a message
//! (hex, base64, raw bytes, or decoded protobuf text) and the raw byte
//! payload. Codecs are looked up by name through a [`CodecRegistry`],
//! an explicit table built at startup rather than a process-wide
//! mutable registry.
//!
//! Direction convention: [`Codec::decode`] goes from the external form
//! to raw bytes (the direction used when reading input), and
//! [`Codec::encode`] goes from raw bytes to the external form (the
//! direction used when displaying output).

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::decode::{Decoder, DecoderConfig};
use crate::error::{Error, Result};

/// Converts message payloads to and from an external representation
pub trait Codec: Send + Sync {
    /// Name this codec is registered under
    fn name(&self) -> &'static str;

    /// Transform input from the external form into raw bytes
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Transform raw bytes into the external form
    fn encode(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Pass-through codec: payloads are used as-is in both directions
#[derive(Debug, Default, Clone, Copy)]
pub struct RawCodec;

impl Codec for RawCodec {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}

/// Lowercase hexadecimal codec; decoding tolerates surrounding whitespace
#[derive(Debug, Default, Clone, Copy)]
pub struct HexCodec;

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Strip leading and trailing ASCII whitespace, as line-delimited input
/// commonly carries a trailing newline
fn trim_whitespace(mut input: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = input {
        if first.is_ascii_whitespace() {
            input = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = input {
        if last.is_ascii_whitespace() {
            input = rest;
        } else {
            break;
        }
    }
    input
}

impl Codec for HexCodec {
    fn name(&self) -> &'static str {
        "hex"
    }

    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let digits = trim_whitespace(input);
        if digits.len() % 2 != 0 {
            return Err(Error::hex_decode("odd number of hex digits"));
        }

        let mut out = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks_exact(2) {
            let hi = hex_digit(pair[0])
                .ok_or_else(|| Error::hex_decode(format!("invalid hex digit '{}'", pair[0] as char)))?;
            let lo = hex_digit(pair[1])
                .ok_or_else(|| Error::hex_decode(format!("invalid hex digit '{}'", pair[1] as char)))?;
            out.push((hi << 4) | lo);
        }
        Ok(out)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len() * 2);
        for byte in input {
            out.push(b"0123456789abcdef"[(byte >> 4) as usize]);
            out.push(b"0123456789abcdef"[(byte & 0x0F) as usize]);
        }
        Ok(out)
    }
}

/// Standard-alphabet base64 codec; decoding tolerates surrounding whitespace
#[derive(Debug, Default, Clone, Copy)]
pub struct Base64Codec;

impl Codec for Base64Codec {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(BASE64.decode(trim_whitespace(input))?)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(BASE64.encode(input).into_bytes())
    }
}

/// Codec that renders protobuf wire format as readable text.
///
/// Only the display direction is supported: producing wire format from
/// text would require a schema.
#[derive(Debug, Default, Clone)]
pub struct ProtobufCodec {
    decoder: Decoder,
}

impl ProtobufCodec {
    /// Creates a protobuf codec with default decoder configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a protobuf codec with custom decoder configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            decoder: Decoder::with_config(config),
        }
    }
}

impl Codec for ProtobufCodec {
    fn name(&self) -> &'static str {
        "protobuf"
    }

    fn decode(&self, _input: &[u8]) -> Result<Vec<u8>> {
        Err(Error::CodecUnsupported {
            name: "protobuf",
            direction: "producing wire format from text",
        })
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(self.decoder.decode(input)?.into_bytes())
    }
}

/// Factory closure producing a boxed codec
pub type CodecFactory = Box<dyn Fn() -> Box<dyn Codec> + Send + Sync>;

/// Explicit name-to-factory table of available codecs
pub struct CodecRegistry {
    table: HashMap<String, CodecFactory>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CodecRegistry {
    /// Creates an empty registry
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Creates a registry populated with the built-in codecs:
    /// `raw`, `hex`, `base64`, and `protobuf`
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("raw", || Box::new(RawCodec));
        registry.register("hex", || Box::new(HexCodec));
        registry.register("base64", || Box::new(Base64Codec));
        registry.register("protobuf", || Box::new(ProtobufCodec::new()));
        registry
    }

    /// Registers a codec factory under the given name, replacing any
    /// previous registration
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Codec> + Send + Sync + 'static,
    ) {
        self.table.insert(name.into(), Box::new(factory));
    }

    /// Instantiates the codec registered under `name`
    pub fn get(&self, name: &str) -> Result<Box<dyn Codec>> {
        self.table
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| Error::unknown_format(name))
    }

    /// Returns the registered codec names, sorted
    pub fn available(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
