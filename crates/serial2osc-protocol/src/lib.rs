//! # serial2osc-protocol
//!
//! OSC 1.0 wire format for serial2osc.
//!
//! This crate turns `OutboundMessage`s into OSC packets and back. Only the
//! `i` (int32) and `f` (float32) argument types are supported, which is all
//! the translation engine produces.

pub mod codec;

pub use codec::*;
