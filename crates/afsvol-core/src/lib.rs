#![forbid(unsafe_code)]
//! File-backed access to volumes on a namei partition.
//!
//! `afsvol-ondisk` and `afsvol-namei` are pure: they take bytes and ids and
//! return records and paths. This crate reads the files, converts parse
//! failures into [`AfsError`] with the offending path attached, and walks
//! `vicep*` partitions.

pub mod scan;

use afsvol_error::{AfsError, Result};
use afsvol_namei::{CaseSensitivity, NameiPath};
use afsvol_ondisk::{VolumeDiskData, VolumeHeader};
use afsvol_types::{ByteOrder, ErrorKind, ObjectId, ParseError, VolumeId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use scan::{
    ScanFailure, ScanOptions, ScanReport, VolumeSummary, discover_headers, discover_partitions,
    is_partition_name, scan,
};

/// How metadata files are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Byte order the fileserver wrote the metadata in.
    pub byte_order: ByteOrder,
    /// Digit alphabet of the namei tree; `Insensitive` for case-folding
    /// filesystems.
    pub case_sensitivity: CaseSensitivity,
}

impl DecodeOptions {
    #[must_use]
    pub fn namei(self) -> NameiPath {
        NameiPath::with_case(self.case_sensitivity)
    }
}

/// Convert a parse-layer error into an [`AfsError`], naming the file.
#[must_use]
pub fn parse_error_to_afs(e: &ParseError, path: &Path) -> AfsError {
    let detail = format!("{}: {e}", path.display());
    match e.kind() {
        ErrorKind::Format => AfsError::Format(detail),
        ErrorKind::Validation => AfsError::Validation(detail),
        ErrorKind::Domain => AfsError::Domain(detail),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path).map_err(|e| AfsError::io(path, e))?;
    debug!(
        target: "afsvol::core",
        path = %path.display(),
        bytes = data.len(),
        "metadata_file_read"
    );
    Ok(data)
}

/// Read and decode a `V*.vol` header file.
///
/// # Errors
///
/// I/O failures, including [`AfsError::NotFound`], and header decode
/// errors converted by [`parse_error_to_afs`].
pub fn read_header(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<VolumeHeader> {
    let path = path.as_ref();
    let data = read_file(path)?;
    VolumeHeader::parse(&data, options.byte_order).map_err(|e| parse_error_to_afs(&e, path))
}

/// Read and decode a volume-info special file.
///
/// # Errors
///
/// I/O failures, including [`AfsError::NotFound`], and record decode
/// errors converted by [`parse_error_to_afs`].
pub fn read_disk_data(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<VolumeDiskData> {
    let path = path.as_ref();
    let data = read_file(path)?;
    VolumeDiskData::parse(&data, options.byte_order).map_err(|e| parse_error_to_afs(&e, path))
}

/// The partition a header file lives on: its parent directory.
///
/// # Errors
///
/// Returns [`AfsError::Usage`] for a path with no parent, such as `/`.
pub fn partition_of(header_path: &Path) -> Result<PathBuf> {
    match header_path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Ok(PathBuf::from(".")),
        Some(parent) => Ok(parent.to_path_buf()),
        None => Err(AfsError::Usage(format!(
            "{} is not a header file path",
            header_path.display()
        ))),
    }
}

/// A header's special object and where it lives on the partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecialPath {
    pub name: &'static str,
    pub object_id: ObjectId,
    /// `None` when the header does not reference the object (id zero).
    pub path: Option<PathBuf>,
}

/// A header together with its decoded volume-info record.
#[derive(Debug, Clone, Serialize)]
pub struct OpenVolume {
    pub partition: PathBuf,
    pub header_path: PathBuf,
    pub header: VolumeHeader,
    pub info_path: PathBuf,
    pub info: VolumeDiskData,
    pub specials: Vec<SpecialPath>,
}

impl OpenVolume {
    /// Decode the header at `header_path`, then follow its `volume_info`
    /// object through the namei tree of the same partition.
    ///
    /// # Errors
    ///
    /// Any error from [`read_header`] or [`read_disk_data`], and
    /// [`AfsError::Validation`] when the header, its file name and its
    /// volume-info record disagree about the volume id.
    pub fn open(header_path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Self> {
        let header_path = header_path.as_ref();
        let header = read_header(header_path, options)?;
        check_file_name(header_path, &header)?;

        let partition = partition_of(header_path)?;
        let namei = options.namei();
        if header.volume_info == 0 {
            return Err(AfsError::Validation(format!(
                "{}: header has no volume_info object",
                header_path.display()
            )));
        }
        let info_path = namei.resolve(&partition, &header, ObjectId(header.volume_info));
        let info = read_disk_data(&info_path, options)?;
        if info.id != header.id {
            return Err(AfsError::Validation(format!(
                "{}: volume-info id {} does not match header id {}",
                info_path.display(),
                info.id,
                header.id
            )));
        }

        let specials = header
            .special_inodes()
            .into_iter()
            .map(|special| SpecialPath {
                name: special.name,
                object_id: special.object_id,
                path: (special.object_id.0 != 0)
                    .then(|| namei.resolve(&partition, &header, special.object_id)),
            })
            .collect();

        info!(
            target: "afsvol::core",
            volume = header.id,
            name = %info.name,
            volume_type = %info.volume_type,
            partition = %partition.display(),
            "volume_opened"
        );

        Ok(Self {
            partition,
            header_path: header_path.to_path_buf(),
            header,
            info_path,
            info,
            specials,
        })
    }

    #[must_use]
    pub fn volume_id(&self) -> VolumeId {
        self.header.volume_id()
    }
}

/// A conventionally named header (`V0000000007.vol`) must hold that volume.
fn check_file_name(header_path: &Path, header: &VolumeHeader) -> Result<()> {
    let named = header_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(VolumeHeader::id_from_file_name);
    match named {
        Some(id) if id != header.volume_id() => Err(AfsError::Validation(format!(
            "{}: file name says volume {id}, header says {}",
            header_path.display(),
            header.id
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use afsvol_namei::NameiPath;
    use afsvol_ondisk::{VOLUME_DISK_DATA_SIZE, VolumeHeader};
    use afsvol_types::{
        ByteOrder, DESTROY_ME, DONT_SALVAGE, NAMEI_VNODE_MASK, ObjectId, VOLUME_HEADER_MAGIC,
        VOLUME_HEADER_VERSION, VOLUME_INFO_MAGIC, VolumeId,
    };
    use std::fs;
    use std::path::{Path, PathBuf};

    pub fn header(id: u32) -> VolumeHeader {
        let special = |tag: u64| (tag << 26) | NAMEI_VNODE_MASK;
        VolumeHeader {
            magic: VOLUME_HEADER_MAGIC,
            version: VOLUME_HEADER_VERSION,
            id,
            parent: id,
            volume_info: special(1),
            small_vnode_index: special(2),
            large_vnode_index: special(3),
            volume_acl: 0,
            volume_mount_table: 0,
            link_table: special(6),
            reserved: [0; 3],
        }
    }

    pub fn disk_data(id: u32, name: &str, order: ByteOrder) -> Vec<u8> {
        let mut data = vec![0_u8; VOLUME_DISK_DATA_SIZE];
        data[0..4].copy_from_slice(&order.u32_to_bytes(VOLUME_INFO_MAGIC));
        data[4..8].copy_from_slice(&order.u32_to_bytes(1));
        data[8..12].copy_from_slice(&order.u32_to_bytes(id));
        data[12..12 + name.len()].copy_from_slice(name.as_bytes());
        data[44] = 1; // in_use
        data[45] = 1; // in_service
        data[46] = 1; // blessed
        data[56..60].copy_from_slice(&order.u32_to_bytes(id)); // parent_id
        data[73] = DESTROY_ME;
        data[74] = DONT_SALVAGE;
        data
    }

    /// Write a header and its volume-info file onto `partition`.
    pub fn write_volume(partition: &Path, id: u32, name: &str, order: ByteOrder) -> PathBuf {
        let header = header(id);
        let header_path = partition.join(VolumeHeader::file_name(VolumeId(id)));
        fs::write(&header_path, header.to_bytes(order)).expect("write header");

        let info_path = partition.join(
            NameiPath::default().build(&header, ObjectId(header.volume_info)),
        );
        fs::create_dir_all(info_path.parent().expect("info dir")).expect("create namei dirs");
        fs::write(&info_path, disk_data(id, name, order)).expect("write volume info");
        header_path
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{disk_data, header, write_volume};
    use super::*;
    use afsvol_ondisk::VolumeType;

    #[test]
    fn parse_error_to_afs_mapping() {
        let path = Path::new("/vicepa/V0000000007.vol");

        let e = parse_error_to_afs(
            &ParseError::InsufficientData {
                needed: 76,
                offset: 0,
                actual: 75,
            },
            path,
        );
        assert!(matches!(e, AfsError::Format(ref d) if d.starts_with("/vicepa/V0000000007.vol: ")));

        let e = parse_error_to_afs(
            &ParseError::InvalidMagic {
                expected: 0x88A1_BB3C,
                actual: 0,
            },
            path,
        );
        assert!(matches!(e, AfsError::Validation(_)));

        let e = parse_error_to_afs(&ParseError::InvalidVolumeType(3), path);
        assert!(matches!(e, AfsError::Validation(_)));

        let e = parse_error_to_afs(&ParseError::NegativeValue(-1), path);
        assert!(matches!(e, AfsError::Domain(_)));
    }

    #[test]
    fn open_volume_follows_volume_info() {
        let dir = tempfile::tempdir().expect("tempdir");
        let header_path = write_volume(dir.path(), 536_870_912, "root.cell", ByteOrder::Little);

        let volume = OpenVolume::open(&header_path, &DecodeOptions::default()).expect("open");
        assert_eq!(volume.volume_id(), VolumeId(536_870_912));
        assert_eq!(volume.partition, dir.path());
        assert_eq!(volume.info.name, "root.cell");
        assert_eq!(volume.info.volume_type, VolumeType::ReadWrite);
        assert!(volume.info.in_service);
        assert!(volume.info_path.starts_with(dir.path().join("AFSIDat")));
        assert!(volume.info_path.is_file());
    }

    #[test]
    fn specials_skip_unreferenced_objects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let header_path = write_volume(dir.path(), 7, "v", ByteOrder::Little);
        let volume = OpenVolume::open(&header_path, &DecodeOptions::default()).expect("open");

        let names: Vec<_> = volume.specials.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            [
                "volume_info",
                "small_vnode_index",
                "large_vnode_index",
                "volume_acl",
                "volume_mount_table",
                "link_table"
            ]
        );
        assert!(volume.specials[3].path.is_none());
        assert!(volume.specials[4].path.is_none());
        assert_eq!(volume.specials[0].path.as_ref(), Some(&volume.info_path));
        for special in volume.specials.iter().filter_map(|s| s.path.as_ref()) {
            assert!(special.iter().any(|s| s == "special"), "{}", special.display());
        }
    }

    #[test]
    fn big_endian_volume_needs_big_endian_options() {
        let dir = tempfile::tempdir().expect("tempdir");
        let header_path = write_volume(dir.path(), 9, "be.vol", ByteOrder::Big);

        let err = OpenVolume::open(&header_path, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, AfsError::Validation(_)), "{err}");

        let options = DecodeOptions {
            byte_order: ByteOrder::Big,
            ..DecodeOptions::default()
        };
        let volume = OpenVolume::open(&header_path, &options).expect("open big-endian");
        assert_eq!(volume.info.name, "be.vol");
    }

    #[test]
    fn missing_volume_info_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let header_path = dir.path().join(VolumeHeader::file_name(VolumeId(11)));
        fs::write(&header_path, header(11).to_bytes(ByteOrder::Little)).expect("write header");

        let err = OpenVolume::open(&header_path, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, AfsError::NotFound(_)), "{err}");
    }

    #[test]
    fn header_id_must_match_file_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let header_path = dir.path().join(VolumeHeader::file_name(VolumeId(12)));
        fs::write(&header_path, header(13).to_bytes(ByteOrder::Little)).expect("write header");

        let err = OpenVolume::open(&header_path, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, AfsError::Validation(ref d) if d.contains("file name")), "{err}");
    }

    #[test]
    fn info_id_must_match_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let header_path = write_volume(dir.path(), 20, "a", ByteOrder::Little);
        let volume = OpenVolume::open(&header_path, &DecodeOptions::default()).expect("open");
        fs::write(&volume.info_path, disk_data(21, "a", ByteOrder::Little)).expect("rewrite info");

        let err = OpenVolume::open(&header_path, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, AfsError::Validation(ref d) if d.contains("does not match")), "{err}");
    }

    #[test]
    fn short_header_file_is_format_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("V0000000001.vol");
        fs::write(&path, [0_u8; 75]).expect("write");
        let err = read_header(&path, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, AfsError::Format(_)), "{err}");
    }

    #[test]
    fn partition_of_relative_header() {
        assert_eq!(
            partition_of(Path::new("V0000000001.vol")).expect("partition"),
            PathBuf::from(".")
        );
        assert_eq!(
            partition_of(Path::new("/vicepb/V0000000001.vol")).expect("partition"),
            PathBuf::from("/vicepb")
        );
        assert!(partition_of(Path::new("/")).is_err());
    }

    #[test]
    fn open_volume_serializes_to_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let header_path = write_volume(dir.path(), 30, "json.vol", ByteOrder::Little);
        let volume = OpenVolume::open(&header_path, &DecodeOptions::default()).expect("open");
        let value = serde_json::to_value(&volume).expect("serialize");
        assert_eq!(value["header"]["id"], 30);
        assert_eq!(value["info"]["name"], "json.vol");
        assert_eq!(value["specials"][3]["path"], serde_json::Value::Null);
    }
}
