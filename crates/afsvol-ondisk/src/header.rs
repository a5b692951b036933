#![forbid(unsafe_code)]

use afsvol_types::{
    ByteOrder, ObjectId, ParseError, VOLUME_HEADER_MAGIC, VOLUME_HEADER_SIZE,
    VOLUME_HEADER_VERSION, VOLUME_HEADER_WORDS, VolumeId, ensure_exact_len, join_u64, read_u32,
};
use serde::{Deserialize, Serialize};

/// Word index of the first low half (`volumeInfo_lo`).
const LOW_WORDS_START: usize = 4;
/// Word index of the first high half (`volumeInfo_hi`).
const HIGH_WORDS_START: usize = 9;
/// Number of 64-bit fields stored as a block of lows followed by a block of highs.
const SPLIT_FIELDS: usize = 5;
const LINK_TABLE_LO: usize = 14;
const LINK_TABLE_HI: usize = 15;
const RESERVED_START: usize = 16;

/// Decoded volume header file.
///
/// Layout (32-bit words):
///
/// | Word | Field |
/// |------|-------|
/// | 0 | magic |
/// | 1 | version |
/// | 2 | id |
/// | 3 | parent |
/// | 4..9 | low halves of volumeInfo, smallVnodeIndex, largeVnodeIndex, volumeAcl, volumeMountTable |
/// | 9..14 | high halves of the same five fields |
/// | 14, 15 | linkTable low, high |
/// | 16..19 | reserved |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeHeader {
    pub magic: u32,
    pub version: u32,
    pub id: u32,
    pub parent: u32,
    pub volume_info: u64,
    pub small_vnode_index: u64,
    pub large_vnode_index: u64,
    pub volume_acl: u64,
    pub volume_mount_table: u64,
    pub link_table: u64,
    pub reserved: [u32; 3],
}

/// A named special object referenced from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpecialInode {
    pub name: &'static str,
    pub object_id: ObjectId,
}

impl VolumeHeader {
    /// # Errors
    ///
    /// Fails with a Format-kind error unless `data` is exactly 76 bytes, and
    /// with [`ParseError::InvalidMagic`] or [`ParseError::UnsupportedVersion`]
    /// when the version stamp is wrong.
    pub fn parse(data: &[u8], order: ByteOrder) -> Result<Self, ParseError> {
        ensure_exact_len(data, VOLUME_HEADER_SIZE)?;

        let mut words = [0_u32; VOLUME_HEADER_WORDS];
        for (index, word) in words.iter_mut().enumerate() {
            *word = read_u32(data, index * 4, order)?;
        }

        let magic = words[0];
        if magic != VOLUME_HEADER_MAGIC {
            return Err(ParseError::InvalidMagic {
                expected: u64::from(VOLUME_HEADER_MAGIC),
                actual: u64::from(magic),
            });
        }
        let version = words[1];
        if version != VOLUME_HEADER_VERSION {
            return Err(ParseError::UnsupportedVersion {
                expected: VOLUME_HEADER_VERSION,
                actual: version,
            });
        }

        let split: [u64; SPLIT_FIELDS] = std::array::from_fn(|i| {
            join_u64(words[HIGH_WORDS_START + i], words[LOW_WORDS_START + i])
        });

        Ok(Self {
            magic,
            version,
            id: words[2],
            parent: words[3],
            volume_info: split[0],
            small_vnode_index: split[1],
            large_vnode_index: split[2],
            volume_acl: split[3],
            volume_mount_table: split[4],
            link_table: join_u64(words[LINK_TABLE_HI], words[LINK_TABLE_LO]),
            reserved: [
                words[RESERVED_START],
                words[RESERVED_START + 1],
                words[RESERVED_START + 2],
            ],
        })
    }

    /// Encode back into the 76-byte on-disk form.
    #[must_use]
    pub fn to_bytes(&self, order: ByteOrder) -> [u8; VOLUME_HEADER_SIZE] {
        let mut words = [0_u32; VOLUME_HEADER_WORDS];
        words[0] = self.magic;
        words[1] = self.version;
        words[2] = self.id;
        words[3] = self.parent;
        let split = [
            self.volume_info,
            self.small_vnode_index,
            self.large_vnode_index,
            self.volume_acl,
            self.volume_mount_table,
        ];
        for (i, value) in split.into_iter().enumerate() {
            let (high, low) = split_u64(value);
            words[LOW_WORDS_START + i] = low;
            words[HIGH_WORDS_START + i] = high;
        }
        let (high, low) = split_u64(self.link_table);
        words[LINK_TABLE_LO] = low;
        words[LINK_TABLE_HI] = high;
        words[RESERVED_START..].copy_from_slice(&self.reserved);

        let mut out = [0_u8; VOLUME_HEADER_SIZE];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&order.u32_to_bytes(word));
        }
        out
    }

    #[must_use]
    pub fn volume_id(&self) -> VolumeId {
        VolumeId(self.id)
    }

    #[must_use]
    pub fn parent_id(&self) -> VolumeId {
        VolumeId(self.parent)
    }

    /// A read-write volume is its own parent.
    #[must_use]
    pub fn is_read_write(&self) -> bool {
        self.id == self.parent
    }

    /// Special objects in header order.
    #[must_use]
    pub fn special_inodes(&self) -> [SpecialInode; 6] {
        [
            ("volume_info", self.volume_info),
            ("small_vnode_index", self.small_vnode_index),
            ("large_vnode_index", self.large_vnode_index),
            ("volume_acl", self.volume_acl),
            ("volume_mount_table", self.volume_mount_table),
            ("link_table", self.link_table),
        ]
        .map(|(name, raw)| SpecialInode {
            name,
            object_id: ObjectId(raw),
        })
    }

    /// Conventional header file name on a partition, e.g. `V0536870912.vol`.
    #[must_use]
    pub fn file_name(id: VolumeId) -> String {
        format!("V{:010}.vol", id.0)
    }

    /// Inverse of [`VolumeHeader::file_name`].
    #[must_use]
    pub fn id_from_file_name(name: &str) -> Option<VolumeId> {
        let digits = name.strip_prefix('V')?.strip_suffix(".vol")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(VolumeId)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn split_u64(value: u64) -> (u32, u32) {
    ((value >> 32) as u32, value as u32)
}
