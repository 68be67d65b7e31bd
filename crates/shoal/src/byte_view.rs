// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display};

use bytes::Bytes;
use shoal_lru::ByteLen;

/// An immutable view of a cached value.
///
/// Clones share the same buffer, and nothing can write through a view, so values handed out by a
/// [`Group`](crate::Group) can never alter what stays cached. Use [`to_vec`](Self::to_vec) for an
/// owned copy that can be modified.
///
/// # Examples
///
/// ```
/// use shoal::ByteView;
///
/// let view = ByteView::from("630");
/// let mut copy = view.to_vec();
/// copy[0] = b'9';
///
/// assert_eq!(view.as_bytes(), b"630");
/// assert_eq!(view.to_string(), "630");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteView(Bytes);

impl ByteView {
    /// Returns the number of bytes in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the view holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the viewed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns an owned copy of the bytes.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Converts the view into the shared buffer backing it.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl ByteLen for ByteView {
    fn byte_len(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Renders the bytes as UTF-8, replacing invalid sequences.
impl Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<Bytes> for ByteView {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<String> for ByteView {
    fn from(value: String) -> Self {
        Self(Bytes::from(value))
    }
}

impl From<&str> for ByteView {
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<&[u8]> for ByteView {
    fn from(value: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(value))
    }
}

impl From<ByteView> for Bytes {
    fn from(view: ByteView) -> Self {
        view.0
    }
}
