//! Buffer guard
//!
//! Owns detachment-proof copies of raw document bytes. Every other component
//! consumes an [`OwnedBuffer`] issued here, never a caller's slice, so a host
//! that recycles or frees its source memory after an asynchronous hand-off
//! cannot corrupt a snapshot.

use crate::error::{EngineError, Result};
use std::fmt;
use std::sync::{Arc, Weak};

const MIN_DOCUMENT_LEN: usize = 8;
const SIGNATURE: &[u8] = b"%PDF-";
const EOF_MARKER: &[u8] = b"%%EOF";
/// Readers tolerate junk before the header and after the trailer within this window
const SCAN_WINDOW: usize = 1024;

/// Immutable, reference-counted document bytes
#[derive(Clone, PartialEq, Eq)]
pub struct OwnedBuffer {
    bytes: Arc<[u8]>,
}

impl OwnedBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// A non-owning view for the viewer. It stays valid only while some owner
    /// (usually an edit session snapshot) keeps this buffer alive.
    pub fn view(&self) -> BufferView {
        BufferView {
            bytes: Arc::downgrade(&self.bytes),
        }
    }

    /// PDF version from the header (e.g. "1.7"), "1.4" when it cannot be read.
    pub fn version(&self) -> String {
        extract_version(&self.bytes)
    }

    /// Wrap freshly serialized output without another copy.
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(EngineError::EmptyBuffer);
        }
        Ok(Self {
            bytes: Arc::from(bytes),
        })
    }
}

impl AsRef<[u8]> for OwnedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for OwnedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedBuffer")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Weak handle to an [`OwnedBuffer`]
#[derive(Clone, Debug)]
pub struct BufferView {
    bytes: Weak<[u8]>,
}

impl BufferView {
    /// Take an owned copy of the viewed snapshot.
    pub fn copy(&self) -> Result<OwnedBuffer> {
        self.bytes
            .upgrade()
            .map(|bytes| OwnedBuffer { bytes })
            .ok_or(EngineError::BufferDetached)
    }

    pub fn is_detached(&self) -> bool {
        self.bytes.strong_count() == 0
    }
}

/// Copy caller bytes into a buffer whose lifetime is independent of the source.
pub fn copy(bytes: &[u8]) -> Result<OwnedBuffer> {
    if bytes.is_empty() {
        return Err(EngineError::EmptyBuffer);
    }
    Ok(OwnedBuffer {
        bytes: Arc::from(bytes),
    })
}

/// Check that the bytes look like a PDF before any parse is attempted.
pub fn validate_header(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(EngineError::EmptyBuffer);
    }

    if bytes.len() < MIN_DOCUMENT_LEN {
        return Err(EngineError::MalformedDocument(
            "File too small to be a valid PDF".to_string(),
        ));
    }

    if find_signature(bytes).is_none() {
        return Err(EngineError::MalformedDocument(
            "Not a valid PDF file (missing %PDF- header)".to_string(),
        ));
    }

    let tail = &bytes[bytes.len().saturating_sub(SCAN_WINDOW)..];
    if !tail.windows(EOF_MARKER.len()).any(|w| w == EOF_MARKER) {
        return Err(EngineError::MalformedDocument(
            "PDF appears truncated (missing %%EOF marker)".to_string(),
        ));
    }

    Ok(())
}

pub fn is_plausible(bytes: &[u8]) -> bool {
    validate_header(bytes).is_ok()
}

fn find_signature(bytes: &[u8]) -> Option<usize> {
    let head = &bytes[..bytes.len().min(SCAN_WINDOW)];
    head.windows(SIGNATURE.len()).position(|w| w == SIGNATURE)
}

/// Extract PDF version from header
fn extract_version(bytes: &[u8]) -> String {
    // Header format: %PDF-1.7
    if let Some(start) = find_signature(bytes) {
        let version_start = start + SIGNATURE.len();
        if let Some(version_bytes) = bytes.get(version_start..version_start + 3) {
            if let Ok(version) = std::str::from_utf8(version_bytes) {
                let version = version.trim();
                if !version.is_empty() {
                    return version.to_string();
                }
            }
        }
    }
    "1.4".to_string() // Default version
}
