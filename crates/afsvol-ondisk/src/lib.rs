#![forbid(unsafe_code)]
//! On-disk format parsing for AFS volume metadata.
//!
//! Pure parsing crate with no I/O. Parses byte slices into
//! typed Rust structures representing the 76-byte volume header
//! (`V%010u.vol`) and the fixed-layout `VolumeDiskData` record stored in the
//! volume-info special file.

pub mod disk_data;
pub mod header;

pub use disk_data::{
    FieldKind, FieldSpec, FieldValue, Sentinel, VOLUME_DISK_DATA_LAYOUT, VOLUME_DISK_DATA_SIZE,
    VolumeDiskData, VolumeStats, VolumeType, decode_layout, encode_layout, field_offset,
    layout_size,
};
pub use header::{SpecialInode, VolumeHeader};
