//! Fixed-width, totally ordered index keys.

use std::cmp::Ordering;
use std::fmt;

use crate::common::{Error, Result};

/// Logical type of the keys of one index.
///
/// Every type has a fixed serialized width, which is what lets node
/// capacity be computed from the page size alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Bool,
    Int,
    Long,
    Float,
    /// Fixed-width string of `n` bytes, NUL-padded on disk.
    String(usize),
}

impl KeyType {
    const TAG_BOOL: u8 = 0;
    const TAG_INT: u8 = 1;
    const TAG_LONG: u8 = 2;
    const TAG_FLOAT: u8 = 3;
    const TAG_STRING: u8 = 4;

    /// Serialized width of one key in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            KeyType::Bool => 1,
            KeyType::Int | KeyType::Float => 4,
            KeyType::Long => 8,
            KeyType::String(n) => *n,
        }
    }

    /// Tag byte persisted in the index header.
    pub fn tag(&self) -> u8 {
        match self {
            KeyType::Bool => Self::TAG_BOOL,
            KeyType::Int => Self::TAG_INT,
            KeyType::Long => Self::TAG_LONG,
            KeyType::Float => Self::TAG_FLOAT,
            KeyType::String(_) => Self::TAG_STRING,
        }
    }

    /// Rebuild a key type from its header tag and width.
    pub fn from_tag(tag: u8, width: u32) -> Option<Self> {
        match tag {
            Self::TAG_BOOL => Some(KeyType::Bool),
            Self::TAG_INT => Some(KeyType::Int),
            Self::TAG_LONG => Some(KeyType::Long),
            Self::TAG_FLOAT => Some(KeyType::Float),
            Self::TAG_STRING if width > 0 => Some(KeyType::String(width as usize)),
            _ => None,
        }
    }

    /// Verify that `key` can be stored in an index of this type.
    pub fn check(&self, key: &Key) -> Result<()> {
        let ok = match (self, key) {
            (KeyType::Bool, Key::Bool(_))
            | (KeyType::Int, Key::Int(_))
            | (KeyType::Long, Key::Long(_))
            | (KeyType::Float, Key::Float(_)) => true,
            (KeyType::String(n), Key::String(s)) => s.len() <= *n && !s.contains('\0'),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::KeyTypeMismatch {
                expected: self.to_string(),
                found: format!("{:?}", key),
            })
        }
    }

    /// Decode one key from the first `size_in_bytes()` bytes of `data`.
    ///
    /// Returns `None` when the bytes are too short or do not form a key.
    pub fn decode(&self, data: &[u8]) -> Option<Key> {
        let width = self.size_in_bytes();
        let bytes = data.get(..width)?;
        match self {
            KeyType::Bool => match bytes[0] {
                0 => Some(Key::Bool(false)),
                1 => Some(Key::Bool(true)),
                _ => None,
            },
            KeyType::Int => Some(Key::Int(i32::from_le_bytes(bytes.try_into().ok()?))),
            KeyType::Long => Some(Key::Long(i64::from_le_bytes(bytes.try_into().ok()?))),
            KeyType::Float => Some(Key::Float(f32::from_le_bytes(bytes.try_into().ok()?))),
            KeyType::String(_) => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(width);
                let s = std::str::from_utf8(&bytes[..end]).ok()?;
                Some(Key::String(s.to_string()))
            }
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Bool => write!(f, "bool"),
            KeyType::Int => write!(f, "int"),
            KeyType::Long => write!(f, "long"),
            KeyType::Float => write!(f, "float"),
            KeyType::String(n) => write!(f, "string({})", n),
        }
    }
}

/// A single index key.
///
/// Keys are totally ordered. Floats compare with `f32::total_cmp`, so NaN
/// has a stable position instead of breaking the sort order.
#[derive(Debug, Clone)]
pub enum Key {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    String(String),
}

impl Key {
    fn rank(&self) -> u8 {
        match self {
            Key::Bool(_) => 0,
            Key::Int(_) => 1,
            Key::Long(_) => 2,
            Key::Float(_) => 3,
            Key::String(_) => 4,
        }
    }

    /// Append the fixed-width encoding of this key to `buf`.
    ///
    /// Strings are NUL-padded to the width of `key_type`; the caller must
    /// have checked the key with [`KeyType::check`].
    pub fn write_to(&self, key_type: KeyType, buf: &mut Vec<u8>) {
        match self {
            Key::Bool(b) => buf.push(u8::from(*b)),
            Key::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Key::Long(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Key::Float(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Key::String(s) => {
                let width = key_type.size_in_bytes();
                buf.extend_from_slice(s.as_bytes());
                buf.resize(buf.len() + width - s.len(), 0);
            }
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Bool(a), Key::Bool(b)) => a.cmp(b),
            (Key::Int(a), Key::Int(b)) => a.cmp(b),
            (Key::Long(a), Key::Long(b)) => a.cmp(b),
            (Key::Float(a), Key::Float(b)) => a.total_cmp(b),
            (Key::String(a), Key::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bool(b) => write!(f, "{}", b),
            Key::Int(v) => write!(f, "{}", v),
            Key::Long(v) => write!(f, "{}", v),
            Key::Float(v) => write!(f, "{}", v),
            Key::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Key {
    fn from(value: bool) -> Self {
        Key::Bool(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Long(value)
    }
}

impl From<f32> for Key {
    fn from(value: f32) -> Self {
        Key::Float(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(KeyType::Bool.size_in_bytes(), 1);
        assert_eq!(KeyType::Int.size_in_bytes(), 4);
        assert_eq!(KeyType::Long.size_in_bytes(), 8);
        assert_eq!(KeyType::Float.size_in_bytes(), 4);
        assert_eq!(KeyType::String(12).size_in_bytes(), 12);
    }

    #[test]
    fn test_tag_roundtrip() {
        for ty in [
            KeyType::Bool,
            KeyType::Int,
            KeyType::Long,
            KeyType::Float,
            KeyType::String(9),
        ] {
            let width = ty.size_in_bytes() as u32;
            assert_eq!(KeyType::from_tag(ty.tag(), width), Some(ty));
        }
        assert_eq!(KeyType::from_tag(42, 4), None);
        assert_eq!(KeyType::from_tag(KeyType::TAG_STRING, 0), None);
    }

    #[test]
    fn test_encode_decode() {
        let cases = [
            (KeyType::Bool, Key::Bool(true)),
            (KeyType::Int, Key::Int(-17)),
            (KeyType::Long, Key::Long(1 << 40)),
            (KeyType::Float, Key::Float(2.5)),
            (KeyType::String(8), Key::from("abc")),
        ];
        for (ty, key) in cases {
            let mut buf = Vec::new();
            key.write_to(ty, &mut buf);
            assert_eq!(buf.len(), ty.size_in_bytes());
            assert_eq!(ty.decode(&buf), Some(key));
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(KeyType::Bool.decode(&[7]), None);
        assert_eq!(KeyType::Int.decode(&[1, 2]), None);
        assert_eq!(KeyType::String(2).decode(&[0xFF, 0xFE]), None);
    }

    #[test]
    fn test_check() {
        assert!(KeyType::Int.check(&Key::Int(1)).is_ok());
        assert!(KeyType::String(3).check(&Key::from("abc")).is_ok());

        assert!(matches!(
            KeyType::Int.check(&Key::Long(1)),
            Err(Error::KeyTypeMismatch { .. })
        ));
        assert!(KeyType::String(3).check(&Key::from("abcd")).is_err());
        assert!(KeyType::String(3).check(&Key::from("a\0")).is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(Key::Int(-1) < Key::Int(3));
        assert!(Key::from("apple") < Key::from("banana"));
        assert!(Key::Float(-0.5) < Key::Float(0.25));
        assert!(Key::Float(1.0) < Key::Float(f32::NAN));
        assert_eq!(Key::Long(5), Key::Long(5));
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::Int(4).to_string(), "4");
        assert_eq!(Key::from("abc").to_string(), "abc");
        assert_eq!(KeyType::String(10).to_string(), "string(10)");
    }
}
