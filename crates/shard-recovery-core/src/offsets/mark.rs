//! Offset value and local-store key encodings.

use bytes::Bytes;

use crate::error::{OffsetError, OffsetResult};
use crate::journal::JournalName;
use crate::store::{Element, Tuple};

/// Reserved first component of offset mark keys.
pub const MARK_TAG: &str = "_mark";

/// Encode an offset as lowercase, sign-prefixed hexadecimal.
///
/// Matches the encoding used in the coordination tree, so values from both
/// sources compare directly.
#[must_use]
pub fn encode_offset(offset: i64) -> String {
    if offset < 0 {
        format!("-{:x}", offset.unsigned_abs())
    } else {
        format!("{offset:x}")
    }
}

/// Parse a hexadecimal signed 64-bit offset.
///
/// # Errors
///
/// Returns [`OffsetError::ParseOffset`] naming `value` if it is not a valid
/// hexadecimal `i64`.
pub fn parse_offset(value: &str) -> OffsetResult<i64> {
    i64::from_str_radix(value, 16).map_err(|source| OffsetError::ParseOffset {
        value: value.to_string(),
        source,
    })
}

/// Local-store key under which a journal's offset is persisted: the tuple
/// `("_mark", <journal>)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkKey {
    pub journal: JournalName,
}

impl MarkKey {
    #[must_use]
    pub fn new(journal: JournalName) -> Self {
        Self { journal }
    }

    /// Prefix shared by every encoded mark key.
    #[must_use]
    pub fn prefix() -> Bytes {
        Tuple::new(vec![Element::from(MARK_TAG)]).pack()
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        Tuple::new(vec![
            Element::from(MARK_TAG),
            Element::from(self.journal.as_str()),
        ])
        .pack()
    }

    /// Decode and validate an encoded mark key.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a tuple, if the tuple does not have
    /// exactly two components tagged `_mark`, or if the journal component is not
    /// a string.
    pub fn decode(bytes: &[u8]) -> OffsetResult<Self> {
        let tuple = Tuple::unpack(bytes)?;
        if tuple.len() != 2 {
            return Err(OffsetError::BadMarkLength {
                len: tuple.len(),
                key: tuple.to_string(),
            });
        }
        match (tuple.get(0), tuple.get(1)) {
            (Some(Element::Str(tag)), Some(Element::Str(journal))) if tag == MARK_TAG => {
                Ok(Self::new(JournalName::new(journal.clone())))
            }
            _ => Err(OffsetError::BadMarkValue {
                key: tuple.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_offset() {
        assert_eq!(encode_offset(42), "2a");
        assert_eq!(encode_offset(0), "0");
        assert_eq!(encode_offset(-1), "-1");
        assert_eq!(encode_offset(i64::MIN), "-8000000000000000");
        assert_eq!(encode_offset(i64::MAX), "7fffffffffffffff");
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("2a").unwrap(), 42);
        assert_eq!(parse_offset("2A").unwrap(), 42);
        assert_eq!(parse_offset("-1").unwrap(), -1);
        assert_eq!(parse_offset("-8000000000000000").unwrap(), i64::MIN);

        let err = parse_offset("bad-value").unwrap_err();
        assert!(matches!(err, OffsetError::ParseOffset { ref value, .. } if value == "bad-value"));
        assert!(parse_offset("").is_err());
        assert!(parse_offset("8000000000000000").is_err());
    }

    #[test]
    fn test_mark_key_roundtrip() {
        let key = MarkKey::new(JournalName::from("a/journal"));
        let encoded = key.encode();
        assert!(encoded.starts_with(&MarkKey::prefix()));
        assert_eq!(MarkKey::decode(&encoded).unwrap(), key);
    }

    #[test]
    fn test_mark_key_bad_length() {
        let bytes = Tuple::new(vec!["_mark".into(), "a/journal".into(), "foo".into()]).pack();
        let err = MarkKey::decode(&bytes).unwrap_err();
        assert!(matches!(err, OffsetError::BadMarkLength { len: 3, .. }));
        assert!(err.to_string().starts_with("bad DB mark length 3"));

        let bytes = Tuple::new(vec!["_mark".into()]).pack();
        assert!(matches!(
            MarkKey::decode(&bytes),
            Err(OffsetError::BadMarkLength { len: 1, .. })
        ));
    }

    #[test]
    fn test_mark_key_bad_value() {
        let bytes = Tuple::new(vec!["_mark".into(), 0i64.into()]).pack();
        let err = MarkKey::decode(&bytes).unwrap_err();
        assert!(matches!(err, OffsetError::BadMarkValue { .. }));
        assert!(err.to_string().starts_with("bad DB mark value"));
    }

    #[test]
    fn test_mark_key_undecodable() {
        assert!(matches!(
            MarkKey::decode(b"\x02_mark\x00\x02unterminated"),
            Err(OffsetError::Tuple(_))
        ));
    }
}

/// Property-based tests for offset encoding
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_offset_encoding_inverts(offset in any::<i64>()) {
            prop_assert_eq!(parse_offset(&encode_offset(offset)).unwrap(), offset);
        }
    }
}
