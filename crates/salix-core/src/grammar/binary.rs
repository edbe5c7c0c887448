//! Binary artifact framing for grammars.
//!
//! Layout: 4-byte magic, little-endian u16 format version, little-endian
//! u32 CRC-32 of the payload, then the postcard-encoded [`LanguageData`].

use super::types::LanguageData;

/// The artifact format version this build writes.
pub const LANGUAGE_VERSION: u16 = 1;

/// The oldest artifact format version this build still reads.
pub const MIN_COMPATIBLE_VERSION: u16 = 1;

const MAGIC: [u8; 4] = *b"SLXA";
const HEADER_LEN: usize = 10;

/// Errors decoding a grammar artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("not a salix grammar artifact (bad magic)")]
    BadMagic,

    #[error("artifact truncated ({0} bytes)")]
    Truncated(usize),

    #[error(
        "incompatible artifact version {found} (supported: {MIN_COMPATIBLE_VERSION}..={LANGUAGE_VERSION})"
    )]
    IncompatibleVersion { found: u16 },

    #[error("artifact checksum mismatch")]
    ChecksumMismatch,

    #[error("artifact payload malformed: {0}")]
    Decode(#[from] postcard::Error),
}

impl LanguageData {
    /// Serialize to the binary artifact format.
    pub fn to_artifact(&self) -> Vec<u8> {
        let payload = postcard::to_allocvec(self).expect("grammar serialization should not fail");
        let crc = crc32fast::hash(&payload);

        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&LANGUAGE_VERSION.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    /// Deserialize from the binary artifact format, validating magic,
    /// version range, and checksum.
    pub fn from_artifact(bytes: &[u8]) -> Result<Self, ArtifactError> {
        if bytes.len() < HEADER_LEN {
            return Err(ArtifactError::Truncated(bytes.len()));
        }
        if bytes[..4] != MAGIC {
            return Err(ArtifactError::BadMagic);
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if !(MIN_COMPATIBLE_VERSION..=LANGUAGE_VERSION).contains(&version) {
            return Err(ArtifactError::IncompatibleVersion { found: version });
        }

        let crc = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let payload = &bytes[HEADER_LEN..];
        if crc32fast::hash(payload) != crc {
            return Err(ArtifactError::ChecksumMismatch);
        }

        Ok(postcard::from_bytes(payload)?)
    }
}
