//! Binary encoding of values and documents
//!
//! Used for records written to temporary spill files. The format only has to
//! round-trip within one process and is not a persistent storage format.
//!
//! ```text
//! Value    = tag (u8) | payload
//!   NULL      tag 0
//!   BOOL      tag 1 | u8
//!   INTEGER   tag 2 | i64 LE
//!   DOUBLE    tag 3 | u64 LE (IEEE-754 bits)
//!   TEXT      tag 4 | u32 LE length | UTF-8 bytes
//!   BLOB      tag 5 | u32 LE length | bytes
//!   ARRAY     tag 6 | u32 LE count  | Value*
//!   DOCUMENT  tag 7 | Document
//! Document = u32 LE count | (u32 LE name length | name | Value)*
//! ```

use thiserror::Error;

use super::document::Document;
use super::value::Value;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INTEGER: u8 = 2;
const TAG_DOUBLE: u8 = 3;
const TAG_TEXT: u8 = 4;
const TAG_BLOB: u8 = 5;
const TAG_ARRAY: u8 = 6;
const TAG_DOCUMENT: u8 = 7;

/// Errors raised while decoding an encoded value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("unknown value tag {0}")]
    UnknownTag(u8),

    #[error("invalid UTF-8 in text value")]
    InvalidUtf8,
}

/// Appends the encoding of `value` to `buf`
pub fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*b));
        }
        Value::Integer(i) => {
            buf.push(TAG_INTEGER);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Double(d) => {
            buf.push(TAG_DOUBLE);
            buf.extend_from_slice(&d.to_bits().to_le_bytes());
        }
        Value::Text(s) => {
            buf.push(TAG_TEXT);
            encode_bytes(buf, s.as_bytes());
        }
        Value::Blob(b) => {
            buf.push(TAG_BLOB);
            encode_bytes(buf, b);
        }
        Value::Array(items) => {
            buf.push(TAG_ARRAY);
            buf.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                encode_value(buf, item);
            }
        }
        Value::Document(d) => {
            buf.push(TAG_DOCUMENT);
            encode_document(buf, d);
        }
    }
}

/// Appends the encoding of `doc` to `buf`
pub fn encode_document(buf: &mut Vec<u8>, doc: &Document) {
    buf.extend_from_slice(&(doc.len() as u32).to_le_bytes());
    for (name, value) in doc.iter() {
        encode_bytes(buf, name.as_bytes());
        encode_value(buf, value);
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

/// Cursor over an encoded buffer
pub struct Decoder<'a> {
    input: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    /// Bytes not consumed yet
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.input.len() < n {
            return Err(DecodeError::Truncated {
                needed: n,
                remaining: self.input.len(),
            });
        }
        let (head, tail) = self.input.split_at(n);
        self.input = tail;
        Ok(head)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn read_value(&mut self) -> Result<Value, DecodeError> {
        match self.read_u8()? {
            TAG_NULL => Ok(Value::Null),
            TAG_BOOL => Ok(Value::Bool(self.read_u8()? != 0)),
            TAG_INTEGER => Ok(Value::Integer(self.read_u64()? as i64)),
            TAG_DOUBLE => Ok(Value::Double(f64::from_bits(self.read_u64()?))),
            TAG_TEXT => Ok(Value::Text(self.read_string()?)),
            TAG_BLOB => Ok(Value::Blob(self.read_bytes()?.to_vec())),
            TAG_ARRAY => {
                let count = self.read_u32()? as usize;
                // Cap preallocation by what the input could possibly hold
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.read_value()?);
                }
                Ok(Value::Array(items))
            }
            TAG_DOCUMENT => Ok(Value::Document(self.read_document()?)),
            tag => Err(DecodeError::UnknownTag(tag)),
        }
    }

    pub fn read_document(&mut self) -> Result<Document, DecodeError> {
        let count = self.read_u32()? as usize;
        let mut doc = Document::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            let name = self.read_string()?;
            let value = self.read_value()?;
            doc.add(name, value);
        }
        Ok(doc)
    }
}
