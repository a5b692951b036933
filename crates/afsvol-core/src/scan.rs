#![forbid(unsafe_code)]
//! Partition and header discovery.
//!
//! A fileserver host mounts its partitions as `/vicepa` .. `/vicepiv`. Each
//! holds one `V<id>.vol` header per volume next to the `AFSIDat` tree.

use crate::{DecodeOptions, OpenVolume};
use afsvol_error::{AfsError, Result};
use afsvol_ondisk::{VolumeHeader, VolumeType};
use afsvol_types::VolumeId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PARTITION_PREFIX: &str = "vicep";
const MAX_PARTITIONS: u32 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Directory searched for `vicep*` partitions.
    pub root: PathBuf,
    /// Scan exactly these partitions instead of discovering them.
    pub partitions: Vec<PathBuf>,
    pub decode: DecodeOptions,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            partitions: Vec::new(),
            decode: DecodeOptions::default(),
        }
    }
}

/// `vicep` followed by the letters of a partition index: `a`..`z` for 0..25,
/// then `aa`..`iv` for 26..255.
#[must_use]
pub fn is_partition_name(name: &str) -> bool {
    name.strip_prefix(PARTITION_PREFIX)
        .and_then(partition_index)
        .is_some()
}

fn partition_index(suffix: &str) -> Option<u32> {
    let letter = |b: u8| b.checked_sub(b'a').filter(|d| *d < 26).map(u32::from);
    let index = match *suffix.as_bytes() {
        [only] => letter(only)?,
        [high, low] => (letter(high)? + 1) * 26 + letter(low)?,
        _ => return None,
    };
    (index < MAX_PARTITIONS).then_some(index)
}

fn list_dir(dir: &Path, keep: impl Fn(&str, &Path) -> bool) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| AfsError::io(dir, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AfsError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name();
        if name.to_str().is_some_and(|name| keep(name, &path)) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Sorted `vicep*` directories directly under `root`.
///
/// # Errors
///
/// I/O errors reading `root`, or [`AfsError::NoPartitions`].
pub fn discover_partitions(root: &Path) -> Result<Vec<PathBuf>> {
    let partitions = list_dir(root, |name, path| is_partition_name(name) && path.is_dir())?;
    if partitions.is_empty() {
        return Err(AfsError::NoPartitions(root.to_path_buf()));
    }
    debug!(
        target: "afsvol::scan",
        root = %root.display(),
        count = partitions.len(),
        "partitions_discovered"
    );
    Ok(partitions)
}

/// Sorted volume header files on one partition.
///
/// # Errors
///
/// I/O errors reading `partition`.
pub fn discover_headers(partition: &Path) -> Result<Vec<PathBuf>> {
    let headers = list_dir(partition, |name, path| {
        VolumeHeader::id_from_file_name(name).is_some() && path.is_file()
    })?;
    debug!(
        target: "afsvol::scan",
        partition = %partition.display(),
        count = headers.len(),
        "headers_discovered"
    );
    Ok(headers)
}

/// One line of scan output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeSummary {
    pub partition: PathBuf,
    pub header_path: PathBuf,
    pub id: VolumeId,
    pub parent: VolumeId,
    pub name: String,
    pub volume_type: VolumeType,
    pub in_service: bool,
    pub blessed: bool,
    pub needs_salvaged: bool,
    pub max_quota: i32,
    pub disk_used: i32,
    pub file_count: i32,
}

impl From<&OpenVolume> for VolumeSummary {
    fn from(volume: &OpenVolume) -> Self {
        Self {
            partition: volume.partition.clone(),
            header_path: volume.header_path.clone(),
            id: volume.header.volume_id(),
            parent: volume.header.parent_id(),
            name: volume.info.name.clone(),
            volume_type: volume.info.volume_type,
            in_service: volume.info.in_service,
            blessed: volume.info.blessed,
            needs_salvaged: volume.info.needs_salvaged,
            max_quota: volume.info.max_quota,
            disk_used: volume.info.disk_used,
            file_count: volume.info.file_count,
        }
    }
}

/// A header or partition that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub partitions: Vec<PathBuf>,
    pub volumes: Vec<VolumeSummary>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Open every volume on every partition.
///
/// A volume that fails to open is recorded in [`ScanReport::failures`] and
/// the scan moves on. Only partition discovery itself is fatal.
///
/// # Errors
///
/// Only partition discovery errors. Per-volume failures go to the report.
pub fn scan(options: &ScanOptions) -> Result<ScanReport> {
    let partitions = if options.partitions.is_empty() {
        discover_partitions(&options.root)?
    } else {
        options.partitions.clone()
    };

    let mut report = ScanReport {
        partitions: partitions.clone(),
        ..ScanReport::default()
    };
    for partition in &partitions {
        let headers = match discover_headers(partition) {
            Ok(headers) => headers,
            Err(err) => {
                warn!(
                    target: "afsvol::scan",
                    partition = %partition.display(),
                    error = %err,
                    "partition_skipped"
                );
                report.failures.push(ScanFailure {
                    path: partition.clone(),
                    error: err.to_string(),
                });
                continue;
            }
        };

        for header_path in headers {
            match OpenVolume::open(&header_path, &options.decode) {
                Ok(volume) => report.volumes.push(VolumeSummary::from(&volume)),
                Err(err) => {
                    warn!(
                        target: "afsvol::scan",
                        header = %header_path.display(),
                        error = %err,
                        "volume_skipped"
                    );
                    report.failures.push(ScanFailure {
                        path: header_path,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    info!(
        target: "afsvol::scan",
        partitions = report.partitions.len(),
        volumes = report.volumes.len(),
        failures = report.failures.len(),
        "scan_complete"
    );
    Ok(report)
}
