//! Outbound message encoding.
//!
//! Two encodings exist, chosen once at startup:
//!
//! - **Direct address**: `<outputName> clientId v1 ... vN`, all decoded values.
//! - **Indexed buffer**: `/c_setn (clientId + offset) dimension v1 ... vDim`,
//!   which sets `dimension` consecutive slots of a remote buffer starting at
//!   the entry's index. Extra values are dropped here; missing values are an
//!   error.

use thiserror::Error;

use crate::config::{Mode, RuntimeConfig};
use crate::model::{DecodedRecord, OutboundMessage, Value};
use crate::schema::{Schema, SchemaEntry};

/// Address used in indexed-buffer mode.
pub const SETN_ADDRESS: &str = "/c_setn";

/// Errors that drop a single record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Fewer values than the declared dimension in indexed-buffer mode.
    #[error("Line {key:?}: expected {dimension} value(s), got {got}")]
    DimensionUnderflow { key: char, dimension: u32, got: usize },

    /// `clientId + offset` or the dimension does not fit an int32 argument.
    #[error("Line {key:?}: buffer index {client_id} + {offset} is out of range")]
    IndexOverflow { key: char, client_id: i32, offset: u32 },

    /// The record's key has no entry in the schema.
    #[error("Line {0:?}: key not in schema")]
    UnknownKey(char),
}

/// Encode a decoded record into one outbound message.
pub fn encode(
    record: &DecodedRecord,
    schema: &Schema,
    config: &RuntimeConfig,
) -> Result<OutboundMessage, EncodeError> {
    let entry = schema
        .entry_for(record.key)
        .ok_or(EncodeError::UnknownKey(record.key))?;

    match config.mode {
        Mode::DirectAddress => Ok(encode_direct(record, entry, config.client_id)),
        Mode::IndexedBuffer => encode_indexed(record, entry, config.client_id),
    }
}

fn encode_direct(record: &DecodedRecord, entry: &SchemaEntry, client_id: i32) -> OutboundMessage {
    let mut args = Vec::with_capacity(record.values.len() + 1);
    args.push(Value::Int(client_id));
    args.extend_from_slice(&record.values);
    OutboundMessage::new(entry.output_name.clone(), args)
}

fn encode_indexed(
    record: &DecodedRecord,
    entry: &SchemaEntry,
    client_id: i32,
) -> Result<OutboundMessage, EncodeError> {
    let overflow = || EncodeError::IndexOverflow {
        key: record.key,
        client_id,
        offset: entry.offset,
    };

    let index = i32::try_from(entry.offset)
        .ok()
        .and_then(|offset| client_id.checked_add(offset))
        .ok_or_else(overflow)?;
    let dimension = i32::try_from(entry.dimension).map_err(|_| overflow())?;

    let dim = entry.dimension as usize;
    let values = record
        .values
        .get(..dim)
        .ok_or(EncodeError::DimensionUnderflow {
            key: record.key,
            dimension: entry.dimension,
            got: record.values.len(),
        })?;

    let mut args = Vec::with_capacity(dim + 2);
    args.push(Value::Int(index));
    args.push(Value::Int(dimension));
    args.extend_from_slice(values);
    Ok(OutboundMessage::new(SETN_ADDRESS, args))
}
