//! Storage key encoding.
//!
//! Every document lives under a single string key built from its type and
//! local id: `"{type}/{id}"`. Because type names may not contain the
//! separator, the first `/` always marks the boundary, and ids are free to
//! contain further slashes. All keys of one type share the prefix `"{type}/"`,
//! so "every document of this type" is one contiguous range of the store's
//! primary key order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Separator between the type and the local id in a [`StorageKey`].
pub const KEY_SEPARATOR: char = '/';

/// The character immediately after [`KEY_SEPARATOR`]; closes a type range.
const RANGE_END_MARK: char = '0';

/// A validated, totally ordered storage key.
///
/// Can only be produced by [`KeyCodec::encode`] or [`StorageKey::parse`], so
/// the type/id split is always well defined.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey(String);

impl StorageKey {
    /// Parse and validate a raw key read back from a store.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        KeyCodec::decode(&raw)?;
        Ok(Self(raw))
    }

    /// The full key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The document type component.
    pub fn doc_type(&self) -> &str {
        self.split().0
    }

    /// The local id component.
    pub fn local_id(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        self.0
            .split_once(KEY_SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({})", self.0)
    }
}

impl TryFrom<String> for StorageKey {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets ordered maps keyed by `StorageKey` be ranged with plain `&str` bounds.
impl std::borrow::Borrow<str> for StorageKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A half-open `[start, end)` range over the primary key order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    pub start: String,
    pub end: String,
}

impl KeyRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Returns `true` if `key` falls inside the range.
    pub fn contains(&self, key: &str) -> bool {
        self.start.as_str() <= key && key < self.end.as_str()
    }

    /// Returns `true` if no key can fall inside the range.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Encodes `(type, id)` pairs into [`StorageKey`]s and back.
pub struct KeyCodec;

impl KeyCodec {
    /// Encode a type and local id into a storage key.
    ///
    /// # Examples
    ///
    /// ```
    /// use doclink_types::KeyCodec;
    ///
    /// let key = KeyCodec::encode("list", "l1").unwrap();
    /// assert_eq!(key.as_str(), "list/l1");
    /// assert!(KeyCodec::encode("list", "").is_err());
    /// ```
    pub fn encode(doc_type: &str, id: &str) -> Result<StorageKey, ValidationError> {
        Self::validate_type(doc_type)?;
        Self::validate_id(id)?;
        let mut raw = String::with_capacity(doc_type.len() + 1 + id.len());
        raw.push_str(doc_type);
        raw.push(KEY_SEPARATOR);
        raw.push_str(id);
        Ok(StorageKey(raw))
    }

    /// Split a raw key on the first separator and validate both halves.
    pub fn decode(raw: &str) -> Result<(String, String), ValidationError> {
        let (doc_type, id) =
            raw.split_once(KEY_SEPARATOR)
                .ok_or_else(|| ValidationError::MalformedKey {
                    key: raw.to_string(),
                    reason: format!("missing separator {KEY_SEPARATOR:?}"),
                })?;
        Self::validate_type(doc_type).map_err(|e| ValidationError::MalformedKey {
            key: raw.to_string(),
            reason: e.to_string(),
        })?;
        Self::validate_id(id).map_err(|e| ValidationError::MalformedKey {
            key: raw.to_string(),
            reason: e.to_string(),
        })?;
        Ok((doc_type.to_string(), id.to_string()))
    }

    /// The shared prefix of every key of `doc_type`.
    pub fn type_prefix(doc_type: &str) -> Result<String, ValidationError> {
        Self::validate_type(doc_type)?;
        Ok(format!("{doc_type}{KEY_SEPARATOR}"))
    }

    /// The range holding exactly the keys of `doc_type`.
    ///
    /// The end bound swaps the trailing separator for its successor, so the
    /// range contains every string with the type prefix and nothing else.
    pub fn type_range(doc_type: &str) -> Result<KeyRange, ValidationError> {
        let start = Self::type_prefix(doc_type)?;
        Ok(KeyRange::new(start, format!("{doc_type}{RANGE_END_MARK}")))
    }

    /// Validate a document type name.
    pub fn validate_type(doc_type: &str) -> Result<(), ValidationError> {
        let reject = |reason: &str| {
            Err(ValidationError::InvalidType {
                doc_type: doc_type.to_string(),
                reason: reason.to_string(),
            })
        };
        if doc_type.is_empty() {
            return reject("type must not be empty");
        }
        if doc_type.contains(KEY_SEPARATOR) {
            return reject("type must not contain the key separator");
        }
        if doc_type.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return reject("type must not contain whitespace or control characters");
        }
        Ok(())
    }

    /// Validate a local document id.
    pub fn validate_id(id: &str) -> Result<(), ValidationError> {
        let reject = |reason: &str| {
            Err(ValidationError::InvalidId {
                id: id.to_string(),
                reason: reason.to_string(),
            })
        };
        if id.is_empty() {
            return reject("id must not be empty");
        }
        if id.starts_with(KEY_SEPARATOR) {
            return reject("id must not begin with the key separator");
        }
        if id.chars().any(char::is_control) {
            return reject("id must not contain control characters");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_joins_type_and_id() {
        let key = KeyCodec::encode("item", "i1").unwrap();
        assert_eq!(key.as_str(), "item/i1");
        assert_eq!(key.doc_type(), "item");
        assert_eq!(key.local_id(), "i1");
    }

    #[test]
    fn ids_may_contain_separator() {
        let key = KeyCodec::encode("file", "a/b/c").unwrap();
        assert_eq!(key.as_str(), "file/a/b/c");
        let (t, id) = KeyCodec::decode(key.as_str()).unwrap();
        assert_eq!(t, "file");
        assert_eq!(id, "a/b/c");
    }

    #[test]
    fn rejects_degenerate_ids() {
        assert!(matches!(
            KeyCodec::encode("list", ""),
            Err(ValidationError::InvalidId { .. })
        ));
        assert!(matches!(
            KeyCodec::encode("list", "/l1"),
            Err(ValidationError::InvalidId { .. })
        ));
        assert!(KeyCodec::encode("list", "l\n1").is_err());
    }

    #[test]
    fn rejects_bad_types() {
        assert!(KeyCodec::encode("", "x").is_err());
        assert!(KeyCodec::encode("a/b", "x").is_err());
        assert!(KeyCodec::encode("a b", "x").is_err());
    }

    #[test]
    fn decode_rejects_malformed_keys() {
        assert!(KeyCodec::decode("noseparator").is_err());
        assert!(KeyCodec::decode("list/").is_err());
        assert!(KeyCodec::decode("/l1").is_err());
        assert!(StorageKey::parse("list/").is_err());
    }

    #[test]
    fn type_range_is_exact() {
        let range = KeyCodec::type_range("list").unwrap();
        assert_eq!(range.start, KeyCodec::type_prefix("list").unwrap());
        assert!(range.contains("list/l1"));
        assert!(range.contains("list/\u{10FFFF}"));
        assert!(!range.contains("list"));
        assert!(!range.contains("lists/l1"));
        assert!(!range.contains("lisu/x"));
        assert!(!range.contains("item/l1"));
    }

    #[test]
    fn serde_rejects_invalid_key() {
        let key = KeyCodec::encode("item", "i1").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"item/i1\"");
        assert_eq!(serde_json::from_str::<StorageKey>(&json).unwrap(), key);
        assert!(serde_json::from_str::<StorageKey>("\"item/\"").is_err());
    }

    fn doc_type() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9_.-]{0,12}"
    }

    fn local_id() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_.:-][a-zA-Z0-9_.:/ -]{0,24}"
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(t in doc_type(), id in local_id()) {
            let key = KeyCodec::encode(&t, &id).unwrap();
            let (dt, did) = KeyCodec::decode(key.as_str()).unwrap();
            prop_assert_eq!(dt, t);
            prop_assert_eq!(did, id);
        }

        #[test]
        fn keys_stay_inside_their_type_range(
            t in doc_type(),
            other in doc_type(),
            id in local_id(),
        ) {
            let key = KeyCodec::encode(&t, &id).unwrap();
            prop_assert!(KeyCodec::type_range(&t).unwrap().contains(key.as_str()));
            if other != t {
                prop_assert!(!KeyCodec::type_range(&other).unwrap().contains(key.as_str()));
            }
        }

        #[test]
        fn distinct_pairs_give_distinct_keys(
            a in (doc_type(), local_id()),
            b in (doc_type(), local_id()),
        ) {
            let ka = KeyCodec::encode(&a.0, &a.1).unwrap();
            let kb = KeyCodec::encode(&b.0, &b.1).unwrap();
            prop_assert_eq!(a == b, ka == kb);
        }
    }
}
