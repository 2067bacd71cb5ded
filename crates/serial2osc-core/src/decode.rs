//! Line decoding.
//!
//! An input line has the form `<key><v1>,<v2>,...,<vN>`: the first character
//! selects the schema entry, the rest is a comma-separated list of numbers of
//! the entry's declared type.
//!
//! Lines whose key is not in the schema decode to `Ok(None)`. This is the
//! normal path for stream noise and partial lines, not an error.

use thiserror::Error;

use crate::config::Coercion;
use crate::model::{DecodedRecord, Value};
use crate::schema::{Schema, ValueType};

/// Errors that drop a single line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// A token is not a number of the declared type (strict coercion only).
    #[error("Line {key:?}: token {token:?} is not a valid {expected}")]
    Coercion {
        key: char,
        token: String,
        expected: &'static str,
    },
}

/// Decode one raw line against the schema.
pub fn decode_line(
    line: &str,
    schema: &Schema,
    coercion: Coercion,
) -> Result<Option<DecodedRecord>, DecodeError> {
    let line = line.trim_end_matches(['\r', '\n']);

    let mut chars = line.chars();
    let Some(key) = chars.next() else {
        return Ok(None);
    };
    let Some(entry) = schema.entry_for(key) else {
        return Ok(None);
    };

    let values = split_tokens(chars.as_str())
        .map(|token| coerce(key, token, entry.value_type, coercion))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(DecodedRecord { key, values }))
}

/// Split the value list on commas. An empty list has no tokens and trailing
/// empty tokens are dropped; empty tokens in the middle are kept.
fn split_tokens(remainder: &str) -> impl Iterator<Item = &str> {
    let trimmed = remainder.trim_end_matches(',');
    trimmed.split(',').filter(move |_| !trimmed.is_empty())
}

fn coerce(key: char, token: &str, value_type: ValueType, coercion: Coercion) -> Result<Value, DecodeError> {
    match (value_type, coercion) {
        (ValueType::Integer, Coercion::Strict) => token
            .trim()
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|_| coercion_error(key, token, "integer")),
        (ValueType::Float, Coercion::Strict) => token
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Value::Float)
            .ok_or_else(|| coercion_error(key, token, "float")),
        (ValueType::Integer, Coercion::Lenient) => Ok(Value::Int(lenient_int(token))),
        (ValueType::Float, Coercion::Lenient) => Ok(Value::Float(lenient_float(token))),
    }
}

fn coercion_error(key: char, token: &str, expected: &'static str) -> DecodeError {
    DecodeError::Coercion {
        key,
        token: token.to_string(),
        expected,
    }
}

/// Leading-prefix integer parse. Saturates at the `i32` bounds and returns
/// 0 when there is no numeric prefix.
pub fn lenient_int(token: &str) -> i32 {
    let bytes = token.trim_start().as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let mut acc: i64 = 0;
    for d in digits.iter().take_while(|b| b.is_ascii_digit()) {
        acc = (acc * 10 + i64::from(d - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let signed = if negative { -acc } else { acc };
    signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Leading-prefix float parse. Returns 0.0 when there is no numeric prefix.
pub fn lenient_float(token: &str) -> f32 {
    let s = token.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            mantissa_digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return 0.0;
    }

    // exponent only counts when digits follow it
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'-' | b'+') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f32>().unwrap_or(0.0)
}
