//! # serial2osc-core
//!
//! Core translation engine for serial2osc.
//!
//! This crate provides:
//! - Data model types (Value, DecodedRecord, OutboundMessage)
//! - Schema loading and per-key offset computation
//! - Line decoding with strict or lenient numeric coercion
//! - Direct-address and indexed-buffer message encoding
//!
//! This crate is intentionally runtime-agnostic and contains no async code
//! and no I/O beyond reading the schema file.

pub mod config;
pub mod decode;
pub mod encode;
pub mod model;
pub mod schema;

pub use config::{Coercion, Mode, RuntimeConfig};
pub use decode::{decode_line, DecodeError};
pub use encode::{encode, EncodeError, SETN_ADDRESS};
pub use model::*;
pub use schema::{ConfigError, Schema, SchemaEntry, ValueType};
