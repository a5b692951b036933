#![forbid(unsafe_code)]
//! Namei path derivation for AFS volume objects.
//!
//! A namei fileserver stores every object of a volume as a plain file under
//! the partition's `AFSIDat` tree:
//!
//! ```text
//! AFSIDat/<id & 0xff>/<id>/<(vno >> 14) & 0xff>/<(vno >> 9) & 0x1ff>/<object id>
//! AFSIDat/<id & 0xff>/<id>/special/<object id>
//! ```
//!
//! Every segment after `AFSIDat` except `special` is written in
//! [flip-base64](flipbase64). The two shard levels bound the number of
//! entries in any one directory.

pub mod flipbase64;

use afsvol_ondisk::VolumeHeader;
use afsvol_types::{NAMEI_ROOT, NAMEI_SPECIAL, ObjectId, ParseError, VolumeId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use flipbase64::{CaseSensitivity, FlipBase64};

const VOLUME_SHARD_MASK: u32 = 0xFF;
const VNODE_HIGH_SHIFT: u64 = 14;
const VNODE_HIGH_MASK: u64 = 0xFF;
const VNODE_LOW_SHIFT: u64 = 9;
const VNODE_LOW_MASK: u64 = 0x1FF;

/// Segment count of a regular object path, `AFSIDat` included.
const OBJECT_SEGMENTS: usize = 6;
/// Segment count of a special file path, `AFSIDat` included.
const SPECIAL_SEGMENTS: usize = 5;

/// Where a namei path points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameiLocation {
    pub volume_id: VolumeId,
    pub object_id: ObjectId,
}

impl NameiLocation {
    #[must_use]
    pub fn is_special(self) -> bool {
        self.object_id.is_special()
    }
}

/// Builds and parses namei paths with a fixed digit alphabet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameiPath {
    encoder: FlipBase64,
}

impl NameiPath {
    #[must_use]
    pub fn new(encoder: FlipBase64) -> Self {
        Self { encoder }
    }

    #[must_use]
    pub fn with_case(case: CaseSensitivity) -> Self {
        Self::new(FlipBase64::new(case))
    }

    #[must_use]
    pub fn encoder(self) -> FlipBase64 {
        self.encoder
    }

    /// `AFSIDat/<id & 0xff>/<id>`: the directory holding all of a volume's objects.
    #[must_use]
    pub fn volume_dir(self, volume: VolumeId) -> PathBuf {
        self.volume_segments(volume).iter().collect()
    }

    /// Relative path of `object` inside the volume described by `header`.
    #[must_use]
    pub fn build(self, header: &VolumeHeader, object: ObjectId) -> PathBuf {
        self.build_for_volume(header.volume_id(), object)
    }

    #[must_use]
    pub fn build_for_volume(self, volume: VolumeId, object: ObjectId) -> PathBuf {
        self.segments(volume, object).iter().collect()
    }

    /// Path segments in order, starting with `AFSIDat`.
    #[must_use]
    pub fn segments(self, volume: VolumeId, object: ObjectId) -> Vec<String> {
        let mut segments = Vec::with_capacity(OBJECT_SEGMENTS);
        segments.extend(self.volume_segments(volume));
        match self.vnode_shards(object) {
            None => segments.push(NAMEI_SPECIAL.to_owned()),
            Some([high, low]) => {
                segments.push(high);
                segments.push(low);
            }
        }
        segments.push(self.encoder.encode_u64(object.0));
        segments
    }

    /// Absolute path of `object` under a partition root such as `/vicepa`.
    #[must_use]
    pub fn resolve(self, root: &Path, header: &VolumeHeader, object: ObjectId) -> PathBuf {
        root.join(self.build(header, object))
    }

    /// Recover the volume and object ids from a relative namei path.
    ///
    /// The shard directories are recomputed from the decoded ids and must
    /// match the path exactly.
    ///
    /// # Errors
    ///
    /// Validation-kind errors for a wrong shape, a missing `AFSIDat` root or a
    /// shard that disagrees with the ids. Domain-kind errors for undecodable
    /// digits.
    pub fn parse(self, path: &Path) -> Result<NameiLocation, ParseError> {
        // Split the raw text: `components()` would drop `.` and trailing separators.
        let text = path.as_os_str().to_str().ok_or(ParseError::InvalidField {
            field: "namei_path",
            reason: "path is not valid UTF-8",
        })?;
        let segments = text
            .split(std::path::is_separator)
            .map(|part| match part {
                "" | "." | ".." => Err(ParseError::InvalidField {
                    field: "namei_path",
                    reason: "path must be relative with no empty, `.` or `..` segments",
                }),
                _ => Ok(part),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if segments.len() != OBJECT_SEGMENTS && segments.len() != SPECIAL_SEGMENTS {
            return Err(ParseError::InvalidField {
                field: "namei_path",
                reason: "expected 5 or 6 segments",
            });
        }
        if segments[0] != NAMEI_ROOT {
            return Err(ParseError::InvalidField {
                field: "namei_path",
                reason: "path does not start at AFSIDat",
            });
        }

        let volume = u32::try_from(self.encoder.decode(segments[2])?)
            .map(VolumeId)
            .map_err(|_| ParseError::InvalidField {
                field: "volume_id",
                reason: "exceeds 32 bits",
            })?;
        let [_, low, full] = self.volume_segments(volume);
        expect_segment(1, &low, segments[1])?;
        expect_segment(2, &full, segments[2])?;

        let last = segments.len() - 1;
        let object = ObjectId(self.encoder.decode(segments[last])?);
        expect_segment(last, &self.encoder.encode_u64(object.0), segments[last])?;

        match (self.vnode_shards(object), segments.len()) {
            (None, SPECIAL_SEGMENTS) => expect_segment(3, NAMEI_SPECIAL, segments[3])?,
            (Some([high, low]), OBJECT_SEGMENTS) => {
                expect_segment(3, &high, segments[3])?;
                expect_segment(4, &low, segments[4])?;
            }
            (None, _) => {
                return Err(ParseError::InvalidField {
                    field: "namei_path",
                    reason: "special object outside the special directory",
                });
            }
            (Some(_), _) => {
                return Err(ParseError::InvalidField {
                    field: "namei_path",
                    reason: "regular object in the special directory",
                });
            }
        }

        Ok(NameiLocation {
            volume_id: volume,
            object_id: object,
        })
    }

    fn volume_segments(self, volume: VolumeId) -> [String; 3] {
        [
            NAMEI_ROOT.to_owned(),
            self.encoder
                .encode_u64(u64::from(volume.0 & VOLUME_SHARD_MASK)),
            self.encoder.encode_u64(u64::from(volume.0)),
        ]
    }

    /// The two vnode shard directories, or `None` for special files.
    fn vnode_shards(self, object: ObjectId) -> Option<[String; 2]> {
        if object.is_special() {
            return None;
        }
        let vno = object.vnode();
        Some([
            self.encoder
                .encode_u64((vno >> VNODE_HIGH_SHIFT) & VNODE_HIGH_MASK),
            self.encoder
                .encode_u64((vno >> VNODE_LOW_SHIFT) & VNODE_LOW_MASK),
        ])
    }
}

fn expect_segment(segment: usize, expected: &str, actual: &str) -> Result<(), ParseError> {
    if expected == actual {
        return Ok(());
    }
    Err(ParseError::ShardMismatch {
        segment,
        expected: expected.to_owned(),
        actual: actual.to_owned(),
    })
}
