//! OSC packet codec.
//!
//! An OSC message is laid out as:
//!
//! ```text
//! address     "/c_setn\0"             NUL-terminated, padded to 4 bytes
//! type tags   ",iif\0\0\0\0"           ',' + one tag per argument, padded
//! arguments   00 00 00 03 ...          big-endian 32-bit values
//! ```
//!
//! One message travels in one UDP datagram. Bundles are not produced or
//! accepted.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serial2osc_core::{OutboundMessage, Value};
use thiserror::Error;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The address does not start with '/' or contains a NUL byte.
    #[error("Invalid OSC address {0:?}")]
    InvalidAddress(String),

    /// The packet ended before a complete field was read.
    #[error("Truncated packet: needed {needed} more byte(s) for {field}")]
    Truncated { field: &'static str, needed: usize },

    /// A string field is missing its NUL padding or is not UTF-8.
    #[error("Malformed {0} string")]
    MalformedString(&'static str),

    /// The type tag string does not start with ','.
    #[error("Type tag string must start with ','")]
    MissingTypeTags,

    /// An argument type other than 'i' or 'f'.
    #[error("Unsupported OSC type tag {0:?}")]
    UnsupportedTag(char),

    /// Bytes left over after the last argument.
    #[error("{0} trailing byte(s) after message")]
    TrailingBytes(usize),
}

/// Number of bytes a NUL-terminated string of `len` bytes occupies on the wire.
fn padded_len(len: usize) -> usize {
    (len + 4) & !3
}

fn put_padded_str(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    let pad = padded_len(s.len()) - s.len();
    buf.put_bytes(0, pad);
}

/// Size of the encoded packet in bytes.
pub fn encoded_len(msg: &OutboundMessage) -> usize {
    padded_len(msg.address.len()) + padded_len(msg.args.len() + 1) + 4 * msg.args.len()
}

/// Encode a message into a single OSC packet.
pub fn encode_message(msg: &OutboundMessage) -> Result<Bytes, CodecError> {
    if !msg.address.starts_with('/') || msg.address.contains('\0') {
        return Err(CodecError::InvalidAddress(msg.address.clone()));
    }

    let mut buf = BytesMut::with_capacity(encoded_len(msg));
    put_padded_str(&mut buf, &msg.address);

    let mut tags = String::with_capacity(msg.args.len() + 1);
    tags.push(',');
    tags.extend(msg.args.iter().map(Value::type_tag));
    put_padded_str(&mut buf, &tags);

    for arg in &msg.args {
        match *arg {
            Value::Int(v) => buf.put_i32(v),
            Value::Float(v) => buf.put_f32(v),
        }
    }

    Ok(buf.freeze())
}

fn take_padded_str<'a>(buf: &mut &'a [u8], field: &'static str) -> Result<&'a str, CodecError> {
    let bytes: &'a [u8] = *buf;
    let nul = bytes
        .iter()
        .position(|b| *b == 0)
        .ok_or(CodecError::MalformedString(field))?;
    let total = padded_len(nul);
    if bytes.len() < total {
        return Err(CodecError::Truncated {
            field,
            needed: total - bytes.len(),
        });
    }
    if bytes[nul..total].iter().any(|b| *b != 0) {
        return Err(CodecError::MalformedString(field));
    }

    let s = std::str::from_utf8(&bytes[..nul]).map_err(|_| CodecError::MalformedString(field))?;
    *buf = &bytes[total..];
    Ok(s)
}

/// Decode a single OSC packet.
pub fn decode_message(packet: &[u8]) -> Result<OutboundMessage, CodecError> {
    let mut buf = packet;

    let address = take_padded_str(&mut buf, "address")?;
    if !address.starts_with('/') {
        return Err(CodecError::InvalidAddress(address.to_string()));
    }

    let tags = take_padded_str(&mut buf, "type tag")?;
    let tags = tags.strip_prefix(',').ok_or(CodecError::MissingTypeTags)?;

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        if buf.remaining() < 4 {
            return Err(CodecError::Truncated {
                field: "argument",
                needed: 4 - buf.remaining(),
            });
        }
        let value = match tag {
            'i' => Value::Int(buf.get_i32()),
            'f' => Value::Float(buf.get_f32()),
            other => return Err(CodecError::UnsupportedTag(other)),
        };
        args.push(value);
    }

    if buf.has_remaining() {
        return Err(CodecError::TrailingBytes(buf.remaining()));
    }

    Ok(OutboundMessage::new(address, args))
}
