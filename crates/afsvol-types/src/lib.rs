#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Magic stamp of a volume header file (`V%010u.vol`).
pub const VOLUME_HEADER_MAGIC: u32 = 0x88A1_BB3C;
pub const VOLUME_HEADER_VERSION: u32 = 1;
/// 19 words of 32 bits.
pub const VOLUME_HEADER_SIZE: usize = 76;
pub const VOLUME_HEADER_WORDS: usize = VOLUME_HEADER_SIZE / 4;

/// Magic stamp of the volume-info (`VolumeDiskData`) special file.
pub const VOLUME_INFO_MAGIC: u32 = 0x78A1_B2C5;

/// Required value of `VolumeDiskData::destroy_me`.
pub const DESTROY_ME: u8 = 0xD3;
/// Required value of `VolumeDiskData::dont_salvage`.
pub const DONT_SALVAGE: u8 = 0xE5;

pub const VNAME_SIZE: usize = 32;
pub const VMSG_SIZE: usize = 128;

/// Low bits of a namei object id that carry the vnode number.
pub const NAMEI_VNODE_MASK: u64 = 0x003F_FFFF;
/// Root directory of the namei tree on every partition.
pub const NAMEI_ROOT: &str = "AFSIDat";
/// Directory segment used instead of the vnode shards for special files.
pub const NAMEI_SPECIAL: &str = "special";

/// AFS volume identifier (32-bit on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VolumeId(pub u32);

/// Namei object identifier: vnode number in the low bits, tag and
/// uniquifier material above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl ObjectId {
    #[must_use]
    pub fn vnode(self) -> u64 {
        self.0 & NAMEI_VNODE_MASK
    }

    /// Special files (volume info, vnode indices, ACL, link table) use the
    /// all-ones vnode number.
    #[must_use]
    pub fn is_special(self) -> bool {
        self.vnode() == NAMEI_VNODE_MASK
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Byte order used to read 32-bit words from metadata files.
///
/// Volume metadata is written in the fileserver's host order, so the reader
/// has to be told which order to expect. `Native` resolves to the order of
/// the machine running the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
    Native,
}

impl ByteOrder {
    #[must_use]
    pub fn u32_from_bytes(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::Little => u32::from_le_bytes(bytes),
            Self::Big => u32::from_be_bytes(bytes),
            Self::Native => u32::from_ne_bytes(bytes),
        }
    }

    #[must_use]
    pub fn u32_to_bytes(self, value: u32) -> [u8; 4] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
            Self::Native => value.to_ne_bytes(),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Little => "little",
            Self::Big => "big",
            Self::Native => "native",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Structural mismatch: wrong length or leftover bytes.
    Format,
    /// Content fails a required invariant: magic, version, enum, sentinel.
    Validation,
    /// The caller passed a value outside the operation's domain.
    Domain,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("insufficient data: need {needed} bytes at offset {offset}, got {actual}")]
    InsufficientData {
        needed: usize,
        offset: usize,
        actual: usize,
    },
    #[error("trailing data: expected {expected} bytes, got {actual}")]
    TrailingData { expected: usize, actual: usize },
    #[error("invalid magic: expected {expected:#x}, got {actual:#x}")]
    InvalidMagic { expected: u64, actual: u64 },
    #[error("unsupported version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },
    #[error("invalid volume type: {0}")]
    InvalidVolumeType(u32),
    #[error("destroy_me sentinel mismatch: expected {expected:#x}, got {0:#x}", expected = DESTROY_ME)]
    BadDestroyMe(u8),
    #[error("dont_salvage sentinel mismatch: expected {expected:#x}, got {0:#x}", expected = DONT_SALVAGE)]
    BadDontSalvage(u8),
    #[error("invalid field: {field} ({reason})")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
    #[error("namei shard mismatch in segment {segment}: expected {expected:?}, got {actual:?}")]
    ShardMismatch {
        segment: usize,
        expected: String,
        actual: String,
    },
    #[error("negative value {0} cannot be flip-base64 encoded")]
    NegativeValue(i64),
    #[error("character {0:?} is not a flip-base64 digit")]
    InvalidDigit(char),
    #[error("empty flip-base64 string")]
    EmptyDigits,
    #[error("flip-base64 value {0:?} overflows 64 bits")]
    DigitOverflow(String),
}

impl ParseError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientData { .. } | Self::TrailingData { .. } => ErrorKind::Format,
            Self::InvalidMagic { .. }
            | Self::UnsupportedVersion { .. }
            | Self::InvalidVolumeType(_)
            | Self::BadDestroyMe(_)
            | Self::BadDontSalvage(_)
            | Self::InvalidField { .. }
            | Self::ShardMismatch { .. } => ErrorKind::Validation,
            Self::NegativeValue(_)
            | Self::InvalidDigit(_)
            | Self::EmptyDigits
            | Self::DigitOverflow(_) => ErrorKind::Domain,
        }
    }
}

/// Require `data` to be exactly `expected` bytes long.
///
/// # Errors
///
/// Returns [`ParseError::InsufficientData`] for a short buffer and
/// [`ParseError::TrailingData`] for a long one.
pub fn ensure_exact_len(data: &[u8], expected: usize) -> Result<(), ParseError> {
    match data.len().cmp(&expected) {
        std::cmp::Ordering::Less => Err(ParseError::InsufficientData {
            needed: expected,
            offset: 0,
            actual: data.len(),
        }),
        std::cmp::Ordering::Greater => Err(ParseError::TrailingData {
            expected,
            actual: data.len(),
        }),
        std::cmp::Ordering::Equal => Ok(()),
    }
}

/// # Errors
///
/// Returns [`ParseError::InsufficientData`] when the range runs past the end
/// of `data`.
#[inline]
pub fn ensure_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], ParseError> {
    let Some(end) = offset.checked_add(len) else {
        return Err(ParseError::InvalidField {
            field: "offset",
            reason: "overflow",
        });
    };

    if end > data.len() {
        return Err(ParseError::InsufficientData {
            needed: len,
            offset,
            actual: data.len().saturating_sub(offset),
        });
    }

    Ok(&data[offset..end])
}

/// # Errors
///
/// Returns [`ParseError::InsufficientData`] when fewer than 4 bytes remain.
#[inline]
pub fn read_u32(data: &[u8], offset: usize, order: ByteOrder) -> Result<u32, ParseError> {
    let bytes = read_fixed::<4>(data, offset)?;
    Ok(order.u32_from_bytes(bytes))
}

/// # Errors
///
/// Returns [`ParseError::InsufficientData`] when fewer than 4 bytes remain.
#[inline]
pub fn read_i32(data: &[u8], offset: usize, order: ByteOrder) -> Result<i32, ParseError> {
    read_u32(data, offset, order).map(|word| i32::from_ne_bytes(word.to_ne_bytes()))
}

/// # Errors
///
/// Returns [`ParseError::InsufficientData`] when fewer than `N` bytes remain.
#[inline]
pub fn read_fixed<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], ParseError> {
    let bytes = ensure_slice(data, offset, N)?;
    let mut out = [0_u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// Join a split 64-bit field stored as two 32-bit halves.
#[inline]
#[must_use]
pub fn join_u64(high: u32, low: u32) -> u64 {
    (u64::from(high) << 32) | u64::from(low)
}

/// Decode a NUL-terminated fixed buffer. A buffer without NUL is kept whole.
#[must_use]
pub fn trim_nul_padded(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
