//! Opaque argument and result payloads.

use std::fmt;

/// Raw bytes passed to and returned from a module operation.
///
/// The dispatcher never interprets calldata; encoding is a contract between
/// the caller and the module. A few helpers cover the common scalar cases.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Calldata(Vec<u8>);

impl Calldata {
    /// Wrap raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// An empty payload.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Encode a `u64` as eight little-endian bytes.
    pub fn from_u64(value: u64) -> Self {
        Self(value.to_le_bytes().to_vec())
    }

    /// Decode eight little-endian bytes as a `u64`.
    ///
    /// Returns `None` if the payload is not exactly eight bytes long.
    pub fn to_u64(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.0.as_slice().try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    /// Interpret the payload as UTF-8 text.
    pub fn as_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take the raw bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Calldata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Calldata(0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<u8>> for Calldata {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Calldata {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Calldata {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for Calldata {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}
