//! Low-level protobuf wire format parsing.
//!
//! This module implements the wire format primitives the decoder is built
//! on: varint decoding, tag reading, and skipping over legacy groups.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 3: SGROUP (deprecated group start)
//! - 4: EGROUP (deprecated group end)
//! - 5: I32 (fixed32, sfixed32, float)

use crate::error::{Error, Result};

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    Fixed64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    LengthDelimited = 2,
    /// Start group (deprecated)
    StartGroup = 3,
    /// End group (deprecated)
    EndGroup = 4,
    /// 32-bit fixed-width
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(other),
        }
    }
}

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u64 = 536_870_911;

/// Decode a varint from the given bytes.
///
/// Returns the decoded value and the number of bytes consumed, or `None`
/// if the buffer ends mid-varint or the encoding runs past 10 bytes.
pub fn decode_varint(data: &[u8]) -> Option<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= 10 {
            // Varints are at most 10 bytes for a 64-bit value
            return None;
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }
    }

    None
}

/// Decode a field tag at the start of `data`.
///
/// `offset` is the absolute position of the tag within the enclosing
/// buffer and is used only for error context. Returns the field number,
/// wire type, and bytes consumed by the tag varint.
pub fn read_tag(data: &[u8], offset: usize) -> Result<(u64, WireType, usize)> {
    let (tag, tag_len) = decode_varint(data)
        .ok_or_else(|| Error::malformed_tag(offset, "truncated or overlong tag varint"))?;

    let field_number = tag >> 3;
    let wire_bits = (tag & 0x07) as u8;

    let wire_type = WireType::try_from(wire_bits)
        .map_err(|raw| Error::unsupported_wire_type(offset, raw, field_number))?;

    if field_number == 0 {
        return Err(Error::malformed_tag(offset, "field number must be at least 1"));
    }
    if field_number > MAX_FIELD_NUMBER {
        return Err(Error::malformed_tag(
            offset,
            format!("field number {} exceeds the protobuf maximum", field_number),
        ));
    }

    Ok((field_number, wire_type, tag_len))
}

/// Scan forward from just after a start-group tag to the matching
/// end-group tag for `field_number`.
///
/// Intervening values are skipped by wire type without being decoded;
/// inner groups recurse with a depth guard. Returns the total bytes
/// consumed, inclusive of the closing tag, so the caller's cursor can
/// advance past the whole group.
pub fn skip_group(
    data: &[u8],
    field_number: u64,
    depth: usize,
    max_depth: usize,
) -> Result<usize> {
    let mut pos = 0;

    while pos < data.len() {
        let (num, wire_type, tag_len) = read_tag(&data[pos..], pos)?;
        pos += tag_len;

        if wire_type == WireType::EndGroup {
            if num == field_number {
                return Ok(pos);
            }
            // Mismatched close marker: tolerated, keep scanning
            continue;
        }

        let available = data.len() - pos;
        match wire_type {
            WireType::Varint => {
                let (_, len) = decode_varint(&data[pos..])
                    .ok_or_else(|| Error::truncated_value(pos, num, available + 1, available))?;
                pos += len;
            }
            WireType::Fixed64 => {
                if available < 8 {
                    return Err(Error::truncated_value(pos, num, 8, available));
                }
                pos += 8;
            }
            WireType::Fixed32 => {
                if available < 4 {
                    return Err(Error::truncated_value(pos, num, 4, available));
                }
                pos += 4;
            }
            WireType::LengthDelimited => {
                let (length, len_len) = decode_varint(&data[pos..])
                    .ok_or_else(|| Error::truncated_value(pos, num, available + 1, available))?;
                let length = usize::try_from(length).unwrap_or(usize::MAX);
                let total = len_len.saturating_add(length);
                if available < total {
                    return Err(Error::truncated_value(pos, num, total, available));
                }
                pos += total;
            }
            WireType::StartGroup => {
                if depth + 1 > max_depth {
                    return Err(Error::depth_exceeded(max_depth));
                }
                let consumed = skip_group(&data[pos..], num, depth + 1, max_depth)?;
                pos += consumed;
            }
            WireType::EndGroup => unreachable!("handled above"),
        }
    }

    Err(Error::unterminated_group(field_number))
}
