//! Order-preserving composite key encoding.
//!
//! Encodes tuples of strings and signed integers so that the byte order of
//! encoded keys matches the element-wise order of the tuples, and so that a
//! tuple's encoding is a prefix of the encoding of any tuple extending it.
//!
//! # Layout
//!
//! - String: `0x02`, UTF-8 bytes with `0x00` escaped as `0x00 0xff`, then `0x00`
//! - Zero: `0x14`
//! - Positive integer of `n` bytes: `0x14 + n`, big-endian magnitude
//! - Negative integer of `n` bytes: `0x14 - n`, big-endian one's complement

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::TupleError;

const STRING_CODE: u8 = 0x02;
const INT_ZERO_CODE: u8 = 0x14;
const ESCAPE: u8 = 0xff;

/// One element of a composite key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    Str(String),
    Int(i64),
}

impl From<&str> for Element {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Element {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Element {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(v) => write!(f, "{v}"),
        }
    }
}

/// A composite key.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuple(pub Vec<Element>);

impl Tuple {
    #[must_use]
    pub fn new(elements: Vec<Element>) -> Self {
        Self(elements)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Element> {
        self.0.get(idx)
    }

    /// Encode the tuple.
    #[must_use]
    pub fn pack(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for element in &self.0 {
            match element {
                Element::Str(s) => pack_str(&mut buf, s),
                Element::Int(v) => pack_int(&mut buf, *v),
            }
        }
        buf.freeze()
    }

    /// Decode a packed tuple.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are truncated, use an unsupported type
    /// code, or hold an invalid element.
    pub fn unpack(bytes: &[u8]) -> Result<Self, TupleError> {
        let mut elements = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let code = bytes[pos];
            let (element, next) = match code {
                STRING_CODE => unpack_str(bytes, pos + 1)?,
                0x0c..=0x1c => unpack_int(bytes, pos)?,
                _ => {
                    return Err(TupleError::UnknownTypeCode {
                        code,
                        position: pos,
                    })
                }
            };
            elements.push(element);
            pos = next;
        }
        Ok(Self(elements))
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, element) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        f.write_str(")")
    }
}

fn pack_str(buf: &mut BytesMut, s: &str) {
    buf.put_u8(STRING_CODE);
    for &b in s.as_bytes() {
        buf.put_u8(b);
        if b == 0x00 {
            buf.put_u8(ESCAPE);
        }
    }
    buf.put_u8(0x00);
}

fn pack_int(buf: &mut BytesMut, v: i64) {
    if v == 0 {
        buf.put_u8(INT_ZERO_CODE);
        return;
    }
    let magnitude = v.unsigned_abs();
    let n = byte_len(magnitude);
    let raw = if v > 0 { magnitude } else { !magnitude };
    let code = if v > 0 {
        INT_ZERO_CODE + n as u8
    } else {
        INT_ZERO_CODE - n as u8
    };
    buf.put_u8(code);
    buf.put_slice(&raw.to_be_bytes()[8 - n..]);
}

fn byte_len(v: u64) -> usize {
    8 - (v.leading_zeros() / 8) as usize
}

fn unpack_str(bytes: &[u8], start: usize) -> Result<(Element, usize), TupleError> {
    let mut out = Vec::new();
    let mut pos = start;
    loop {
        let Some(&b) = bytes.get(pos) else {
            return Err(TupleError::Truncated(pos));
        };
        if b == 0x00 {
            if bytes.get(pos + 1) == Some(&ESCAPE) {
                out.push(0x00);
                pos += 2;
                continue;
            }
            pos += 1;
            break;
        }
        out.push(b);
        pos += 1;
    }
    let s = String::from_utf8(out).map_err(|_| TupleError::InvalidUtf8)?;
    Ok((Element::Str(s), pos))
}

fn unpack_int(bytes: &[u8], pos: usize) -> Result<(Element, usize), TupleError> {
    let code = bytes[pos];
    let n = usize::from(code.abs_diff(INT_ZERO_CODE));
    let start = pos + 1;
    let end = start + n;
    if end > bytes.len() {
        return Err(TupleError::Truncated(bytes.len()));
    }

    let mut raw = [0u8; 8];
    raw[8 - n..].copy_from_slice(&bytes[start..end]);
    let raw = u64::from_be_bytes(raw);

    let value = if code >= INT_ZERO_CODE {
        i64::try_from(raw).map_err(|_| TupleError::IntegerOverflow(n))?
    } else {
        let mask = if n == 8 { u64::MAX } else { (1u64 << (8 * n)) - 1 };
        let magnitude = mask - raw;
        if magnitude > i64::MIN.unsigned_abs() {
            return Err(TupleError::IntegerOverflow(n));
        }
        0i64.wrapping_sub_unsigned(magnitude)
    };
    Ok((Element::Int(value), end))
}


/// Property-based tests for tuple encoding
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_element() -> impl Strategy<Value = Element> {
        prop_oneof![any::<i64>().prop_map(Element::Int), ".*".prop_map(Element::Str)]
    }

    proptest! {
        /// Integer byte order matches numeric order.
        #[test]
        fn prop_int_order(a in any::<i64>(), b in any::<i64>()) {
            let pa = Tuple::new(vec![a.into()]).pack();
            let pb = Tuple::new(vec![b.into()]).pack();
            prop_assert_eq!(a.cmp(&b), pa.cmp(&pb));
        }

        /// Decoding recovers every encoded tuple.
        #[test]
        fn prop_unpack_inverts_pack(elements in prop::collection::vec(arb_element(), 0..5)) {
            let t = Tuple::new(elements);
            prop_assert_eq!(Tuple::unpack(&t.pack()).unwrap(), t);
        }
    }
}
