//! Data model types shared between the decoder, the encoder and the wire codec.

/// A single numeric argument.
///
/// The two variants map one-to-one onto the OSC `i` (int32) and `f`
/// (float32) type tags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
}

impl Value {
    /// OSC type tag character for this value.
    pub fn type_tag(&self) -> char {
        match self {
            Value::Int(_) => 'i',
            Value::Float(_) => 'f',
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
        }
    }
}

/// One decoded input line.
///
/// `values` is not checked against the schema dimension; the indexed-buffer
/// encoder is the only place that reconciles the two.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub key: char,
    pub values: Vec<Value>,
}

/// A message ready to hand to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub address: String,
    pub args: Vec<Value>,
}

impl OutboundMessage {
    pub fn new(address: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }
}

impl std::fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags() {
        assert_eq!(Value::Int(3).type_tag(), 'i');
        assert_eq!(Value::Float(1.5).type_tag(), 'f');
    }

    #[test]
    fn test_message_display() {
        let msg = OutboundMessage::new("/c_setn", vec![Value::Int(3), Value::Int(1), Value::Int(37)]);
        assert_eq!(msg.to_string(), "/c_setn 3 1 37");
    }
}
