//! Binary frame type

use std::sync::Arc;

/// Fixed-layout binary frame ready for the wire.
///
/// The first four bytes are always the little-endian type tag. Cloning is
/// cheap; the bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFrame {
    tag: i32,
    bytes: Arc<[u8]>,
}

impl BinaryFrame {
    pub(crate) fn new(tag: i32, bytes: Vec<u8>) -> Self {
        Self { tag, bytes: bytes.into() }
    }

    pub fn tag(&self) -> i32 {
        self.tag
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for BinaryFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
