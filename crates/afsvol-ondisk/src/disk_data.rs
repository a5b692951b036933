#![forbid(unsafe_code)]
//! `VolumeDiskData`: the record stored in a volume's volume-info special file.
//!
//! The record is decoded from a declarative field table
//! ([`VOLUME_DISK_DATA_LAYOUT`]) by one generic routine ([`decode_layout`]).
//! The table doubles as documentation of the on-disk layout: fields appear in
//! file order, each with its fixed width. Booleans and sentinels are one byte;
//! all other scalars are 32-bit words in the caller's [`ByteOrder`].

use afsvol_types::{
    ByteOrder, DESTROY_ME, DONT_SALVAGE, ParseError, VMSG_SIZE, VNAME_SIZE, VOLUME_INFO_MAGIC,
    ensure_exact_len, ensure_slice, read_i32, read_u32, trim_nul_padded,
};
use serde::{Deserialize, Serialize};
use std::fmt;

const RWINFO_FIELDS: usize = 4;
const TIME_FIELDS: usize = 6;

/// Volume type stored in `VolumeDiskData::type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeType {
    ReadWrite,
    ReadOnly,
    Backup,
}

impl VolumeType {
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidVolumeType`] for anything but 0, 1 or 2.
    pub fn from_raw(raw: u32) -> Result<Self, ParseError> {
        match raw {
            0 => Ok(Self::ReadWrite),
            1 => Ok(Self::ReadOnly),
            2 => Ok(Self::Backup),
            other => Err(ParseError::InvalidVolumeType(other)),
        }
    }

    #[must_use]
    pub fn to_raw(self) -> u32 {
        match self {
            Self::ReadWrite => 0,
            Self::ReadOnly => 1,
            Self::Backup => 2,
        }
    }
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = match self {
            Self::ReadWrite => "RW",
            Self::ReadOnly => "RO",
            Self::Backup => "BK",
        };
        f.write_str(short)
    }
}

/// One-byte fields that must hold a fixed constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    DestroyMe,
    DontSalvage,
}

impl Sentinel {
    #[must_use]
    pub fn expected(self) -> u8 {
        match self {
            Self::DestroyMe => DESTROY_ME,
            Self::DontSalvage => DONT_SALVAGE,
        }
    }

    fn check(self, actual: u8) -> Result<u8, ParseError> {
        if actual == self.expected() {
            return Ok(actual);
        }
        Err(match self {
            Self::DestroyMe => ParseError::BadDestroyMe(actual),
            Self::DontSalvage => ParseError::BadDontSalvage(actual),
        })
    }
}

/// Binary shape of one field in a fixed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U32,
    I32,
    Bool,
    VolumeType,
    Sentinel(Sentinel),
    /// NUL-terminated text in a fixed buffer of the given size.
    Text(usize),
    U32Array(usize),
    I32Array(usize),
}

impl FieldKind {
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::U8 | Self::Bool | Self::Sentinel(_) => 1,
            Self::U32 | Self::I32 | Self::VolumeType => 4,
            Self::Text(len) => len,
            Self::U32Array(count) | Self::I32Array(count) => count * 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// On-disk layout of `VolumeDiskData`, in file order.
pub const VOLUME_DISK_DATA_LAYOUT: &[FieldSpec] = &[
    field("magic", FieldKind::U32),
    field("version", FieldKind::U32),
    field("id", FieldKind::U32),
    field("name", FieldKind::Text(VNAME_SIZE)),
    field("in_use", FieldKind::Bool),
    field("in_service", FieldKind::Bool),
    field("blessed", FieldKind::Bool),
    field("needs_salvaged", FieldKind::Bool),
    field("uniquifier", FieldKind::U32),
    field("type", FieldKind::VolumeType),
    field("parent_id", FieldKind::U32),
    field("clone_id", FieldKind::U32),
    field("backup_id", FieldKind::U32),
    field("restored_from_id", FieldKind::U32),
    field("needs_callback", FieldKind::Bool),
    field("destroy_me", FieldKind::Sentinel(Sentinel::DestroyMe)),
    field("dont_salvage", FieldKind::Sentinel(Sentinel::DontSalvage)),
    field("reserveb3", FieldKind::U8),
    field("reserved1", FieldKind::U32Array(6)),
    field("max_quota", FieldKind::I32),
    field("min_quota", FieldKind::I32),
    field("max_files", FieldKind::I32),
    field("account_number", FieldKind::U32),
    field("owner", FieldKind::I32),
    field("reserved2", FieldKind::I32Array(8)),
    field("file_count", FieldKind::I32),
    field("disk_used", FieldKind::I32),
    field("day_use", FieldKind::I32),
    field("week_use", FieldKind::I32Array(7)),
    field("day_use_date", FieldKind::U32),
    field("vol_update_counter", FieldKind::U32),
    field("reserved3", FieldKind::U32Array(10)),
    field("creation_date", FieldKind::U32),
    field("access_date", FieldKind::U32),
    field("update_date", FieldKind::U32),
    field("expiration_date", FieldKind::U32),
    field("backup_date", FieldKind::U32),
    field("copy_date", FieldKind::U32),
    field("stat_initialized", FieldKind::U32),
    field("reserved4", FieldKind::U32Array(7)),
    field("offline_message", FieldKind::Text(VMSG_SIZE)),
    field("stat_reads", FieldKind::U32Array(RWINFO_FIELDS)),
    field("stat_writes", FieldKind::U32Array(RWINFO_FIELDS)),
    field("stat_file_same_author", FieldKind::U32Array(TIME_FIELDS)),
    field("stat_file_diff_author", FieldKind::U32Array(TIME_FIELDS)),
    field("stat_dir_same_author", FieldKind::U32Array(TIME_FIELDS)),
    field("stat_dir_diff_author", FieldKind::U32Array(TIME_FIELDS)),
];

/// Total byte length of a layout.
#[must_use]
pub const fn layout_size(layout: &[FieldSpec]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < layout.len() {
        total += layout[i].kind.width();
        i += 1;
    }
    total
}

/// Byte offset of the named field, if present.
#[must_use]
pub fn field_offset(layout: &[FieldSpec], name: &str) -> Option<usize> {
    let mut offset = 0;
    for spec in layout {
        if spec.name == name {
            return Some(offset);
        }
        offset += spec.kind.width();
    }
    None
}

pub const VOLUME_DISK_DATA_SIZE: usize = layout_size(VOLUME_DISK_DATA_LAYOUT);

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U32(u32),
    I32(i32),
    Bool(bool),
    VolumeType(VolumeType),
    Sentinel(u8),
    Text(String),
    U32Array(Vec<u32>),
    I32Array(Vec<i32>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str("]")
        }

        match self {
            Self::U8(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::VolumeType(v) => write!(f, "{v}"),
            Self::Sentinel(v) => write!(f, "{v:#04x}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::U32Array(items) => list(f, items),
            Self::I32Array(items) => list(f, items),
        }
    }
}

/// Decode `data` field by field according to `layout`.
///
/// Every byte must be consumed: a short buffer fails while reading the
/// field that runs past the end, and leftover bytes fail with
/// [`ParseError::TrailingData`].
///
/// # Errors
///
/// Fails on short or long input, an out-of-range volume type, or a
/// sentinel byte that does not hold its constant.
pub fn decode_layout(
    layout: &[FieldSpec],
    data: &[u8],
    order: ByteOrder,
) -> Result<Vec<(&'static str, FieldValue)>, ParseError> {
    let mut values = Vec::with_capacity(layout.len());
    let mut offset = 0_usize;

    for spec in layout {
        let value = match spec.kind {
            FieldKind::U8 => FieldValue::U8(ensure_slice(data, offset, 1)?[0]),
            FieldKind::U32 => FieldValue::U32(read_u32(data, offset, order)?),
            FieldKind::I32 => FieldValue::I32(read_i32(data, offset, order)?),
            FieldKind::Bool => FieldValue::Bool(ensure_slice(data, offset, 1)?[0] != 0),
            FieldKind::VolumeType => {
                FieldValue::VolumeType(VolumeType::from_raw(read_u32(data, offset, order)?)?)
            }
            FieldKind::Sentinel(sentinel) => {
                FieldValue::Sentinel(sentinel.check(ensure_slice(data, offset, 1)?[0])?)
            }
            FieldKind::Text(len) => FieldValue::Text(trim_nul_padded(ensure_slice(data, offset, len)?)),
            FieldKind::U32Array(count) => FieldValue::U32Array(
                (0..count)
                    .map(|i| read_u32(data, offset + i * 4, order))
                    .collect::<Result<_, _>>()?,
            ),
            FieldKind::I32Array(count) => FieldValue::I32Array(
                (0..count)
                    .map(|i| read_i32(data, offset + i * 4, order))
                    .collect::<Result<_, _>>()?,
            ),
        };
        values.push((spec.name, value));
        offset += spec.kind.width();
    }

    if offset != data.len() {
        return Err(ParseError::TrailingData {
            expected: offset,
            actual: data.len(),
        });
    }

    Ok(values)
}

/// Encode field values according to `layout`. Text longer than its buffer
/// is cut to fit.
///
/// # Errors
///
/// Returns [`ParseError::InvalidField`] when `values` does not follow
/// `layout` name by name and kind by kind.
pub fn encode_layout(
    layout: &[FieldSpec],
    values: &[(&'static str, FieldValue)],
    order: ByteOrder,
) -> Result<Vec<u8>, ParseError> {
    if layout.len() != values.len() {
        return Err(ParseError::InvalidField {
            field: "layout",
            reason: "value count does not match layout",
        });
    }

    let mut out = Vec::with_capacity(layout_size(layout));
    for (spec, (name, value)) in layout.iter().zip(values) {
        if spec.name != *name {
            return Err(ParseError::InvalidField {
                field: spec.name,
                reason: "value out of layout order",
            });
        }
        match (spec.kind, value) {
            (FieldKind::U8, FieldValue::U8(v)) | (FieldKind::Sentinel(_), FieldValue::Sentinel(v)) => {
                out.push(*v);
            }
            (FieldKind::Bool, FieldValue::Bool(v)) => out.push(u8::from(*v)),
            (FieldKind::U32, FieldValue::U32(v)) => out.extend_from_slice(&order.u32_to_bytes(*v)),
            (FieldKind::I32, FieldValue::I32(v)) => {
                out.extend_from_slice(&order.u32_to_bytes(u32::from_ne_bytes(v.to_ne_bytes())));
            }
            (FieldKind::VolumeType, FieldValue::VolumeType(v)) => {
                out.extend_from_slice(&order.u32_to_bytes(v.to_raw()));
            }
            (FieldKind::Text(len), FieldValue::Text(text)) => {
                let bytes = text.as_bytes();
                let used = bytes.len().min(len);
                out.extend_from_slice(&bytes[..used]);
                out.resize(out.len() + (len - used), 0);
            }
            (FieldKind::U32Array(count), FieldValue::U32Array(items)) if items.len() == count => {
                for item in items {
                    out.extend_from_slice(&order.u32_to_bytes(*item));
                }
            }
            (FieldKind::I32Array(count), FieldValue::I32Array(items)) if items.len() == count => {
                for item in items {
                    out.extend_from_slice(&order.u32_to_bytes(u32::from_ne_bytes(item.to_ne_bytes())));
                }
            }
            _ => {
                return Err(ParseError::InvalidField {
                    field: spec.name,
                    reason: "value does not match field kind",
                });
            }
        }
    }
    Ok(out)
}

/// Per-volume access statistics kept at the tail of the record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VolumeStats {
    pub reads: [u32; RWINFO_FIELDS],
    pub writes: [u32; RWINFO_FIELDS],
    pub file_same_author: [u32; TIME_FIELDS],
    pub file_diff_author: [u32; TIME_FIELDS],
    pub dir_same_author: [u32; TIME_FIELDS],
    pub dir_diff_author: [u32; TIME_FIELDS],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDiskData {
    pub magic: u32,
    pub version: u32,
    pub id: u32,
    pub name: String,
    pub in_use: bool,
    pub in_service: bool,
    pub blessed: bool,
    pub needs_salvaged: bool,
    pub uniquifier: u32,
    pub volume_type: VolumeType,
    pub parent_id: u32,
    pub clone_id: u32,
    pub backup_id: u32,
    pub restored_from_id: u32,
    pub needs_callback: bool,
    pub destroy_me: u8,
    pub dont_salvage: u8,
    pub reserveb3: u8,
    pub reserved1: [u32; 6],
    pub max_quota: i32,
    pub min_quota: i32,
    pub max_files: i32,
    pub account_number: u32,
    pub owner: i32,
    pub reserved2: [i32; 8],
    pub file_count: i32,
    pub disk_used: i32,
    pub day_use: i32,
    pub week_use: [i32; 7],
    pub day_use_date: u32,
    pub vol_update_counter: u32,
    pub reserved3: [u32; 10],
    pub creation_date: u32,
    pub access_date: u32,
    pub update_date: u32,
    pub expiration_date: u32,
    pub backup_date: u32,
    pub copy_date: u32,
    pub stat_initialized: u32,
    pub reserved4: [u32; 7],
    pub offline_message: String,
    pub stats: VolumeStats,
}

impl VolumeDiskData {
    /// # Errors
    ///
    /// Fails with a Format-kind error unless `data` is exactly
    /// [`VOLUME_DISK_DATA_SIZE`] bytes. Wrong magic, an unknown volume type and
    /// sentinel mismatches are Validation-kind.
    pub fn parse(data: &[u8], order: ByteOrder) -> Result<Self, ParseError> {
        ensure_exact_len(data, VOLUME_DISK_DATA_SIZE)?;

        let magic = read_u32(data, 0, order)?;
        if magic != VOLUME_INFO_MAGIC {
            return Err(ParseError::InvalidMagic {
                expected: u64::from(VOLUME_INFO_MAGIC),
                actual: u64::from(magic),
            });
        }

        let mut f = Fields(decode_layout(VOLUME_DISK_DATA_LAYOUT, data, order)?.into_iter());
        Ok(Self {
            magic: f.u32("magic")?,
            version: f.u32("version")?,
            id: f.u32("id")?,
            name: f.text("name")?,
            in_use: f.bool("in_use")?,
            in_service: f.bool("in_service")?,
            blessed: f.bool("blessed")?,
            needs_salvaged: f.bool("needs_salvaged")?,
            uniquifier: f.u32("uniquifier")?,
            volume_type: f.volume_type("type")?,
            parent_id: f.u32("parent_id")?,
            clone_id: f.u32("clone_id")?,
            backup_id: f.u32("backup_id")?,
            restored_from_id: f.u32("restored_from_id")?,
            needs_callback: f.bool("needs_callback")?,
            destroy_me: f.sentinel("destroy_me")?,
            dont_salvage: f.sentinel("dont_salvage")?,
            reserveb3: f.u8("reserveb3")?,
            reserved1: f.u32_array("reserved1")?,
            max_quota: f.i32("max_quota")?,
            min_quota: f.i32("min_quota")?,
            max_files: f.i32("max_files")?,
            account_number: f.u32("account_number")?,
            owner: f.i32("owner")?,
            reserved2: f.i32_array("reserved2")?,
            file_count: f.i32("file_count")?,
            disk_used: f.i32("disk_used")?,
            day_use: f.i32("day_use")?,
            week_use: f.i32_array("week_use")?,
            day_use_date: f.u32("day_use_date")?,
            vol_update_counter: f.u32("vol_update_counter")?,
            reserved3: f.u32_array("reserved3")?,
            creation_date: f.u32("creation_date")?,
            access_date: f.u32("access_date")?,
            update_date: f.u32("update_date")?,
            expiration_date: f.u32("expiration_date")?,
            backup_date: f.u32("backup_date")?,
            copy_date: f.u32("copy_date")?,
            stat_initialized: f.u32("stat_initialized")?,
            reserved4: f.u32_array("reserved4")?,
            offline_message: f.text("offline_message")?,
            stats: VolumeStats {
                reads: f.u32_array("stat_reads")?,
                writes: f.u32_array("stat_writes")?,
                file_same_author: f.u32_array("stat_file_same_author")?,
                file_diff_author: f.u32_array("stat_file_diff_author")?,
                dir_same_author: f.u32_array("stat_dir_same_author")?,
                dir_diff_author: f.u32_array("stat_dir_diff_author")?,
            },
        })
    }

    /// Field values in layout order.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        use FieldValue::{Bool, I32, I32Array, Text, U8, U32, U32Array};
        vec![
            ("magic", U32(self.magic)),
            ("version", U32(self.version)),
            ("id", U32(self.id)),
            ("name", Text(self.name.clone())),
            ("in_use", Bool(self.in_use)),
            ("in_service", Bool(self.in_service)),
            ("blessed", Bool(self.blessed)),
            ("needs_salvaged", Bool(self.needs_salvaged)),
            ("uniquifier", U32(self.uniquifier)),
            ("type", FieldValue::VolumeType(self.volume_type)),
            ("parent_id", U32(self.parent_id)),
            ("clone_id", U32(self.clone_id)),
            ("backup_id", U32(self.backup_id)),
            ("restored_from_id", U32(self.restored_from_id)),
            ("needs_callback", Bool(self.needs_callback)),
            ("destroy_me", FieldValue::Sentinel(self.destroy_me)),
            ("dont_salvage", FieldValue::Sentinel(self.dont_salvage)),
            ("reserveb3", U8(self.reserveb3)),
            ("reserved1", U32Array(self.reserved1.to_vec())),
            ("max_quota", I32(self.max_quota)),
            ("min_quota", I32(self.min_quota)),
            ("max_files", I32(self.max_files)),
            ("account_number", U32(self.account_number)),
            ("owner", I32(self.owner)),
            ("reserved2", I32Array(self.reserved2.to_vec())),
            ("file_count", I32(self.file_count)),
            ("disk_used", I32(self.disk_used)),
            ("day_use", I32(self.day_use)),
            ("week_use", I32Array(self.week_use.to_vec())),
            ("day_use_date", U32(self.day_use_date)),
            ("vol_update_counter", U32(self.vol_update_counter)),
            ("reserved3", U32Array(self.reserved3.to_vec())),
            ("creation_date", U32(self.creation_date)),
            ("access_date", U32(self.access_date)),
            ("update_date", U32(self.update_date)),
            ("expiration_date", U32(self.expiration_date)),
            ("backup_date", U32(self.backup_date)),
            ("copy_date", U32(self.copy_date)),
            ("stat_initialized", U32(self.stat_initialized)),
            ("reserved4", U32Array(self.reserved4.to_vec())),
            ("offline_message", Text(self.offline_message.clone())),
            ("stat_reads", U32Array(self.stats.reads.to_vec())),
            ("stat_writes", U32Array(self.stats.writes.to_vec())),
            ("stat_file_same_author", U32Array(self.stats.file_same_author.to_vec())),
            ("stat_file_diff_author", U32Array(self.stats.file_diff_author.to_vec())),
            ("stat_dir_same_author", U32Array(self.stats.dir_same_author.to_vec())),
            ("stat_dir_diff_author", U32Array(self.stats.dir_diff_author.to_vec())),
        ]
    }

    /// # Errors
    ///
    /// Only fails if [`VolumeDiskData::fields`] drifts from
    /// [`VOLUME_DISK_DATA_LAYOUT`].
    pub fn to_bytes(&self, order: ByteOrder) -> Result<Vec<u8>, ParseError> {
        encode_layout(VOLUME_DISK_DATA_LAYOUT, &self.fields(), order)
    }

    /// Quota in 1K blocks; zero means unlimited.
    #[must_use]
    pub fn has_quota(&self) -> bool {
        self.max_quota > 0
    }
}

/// Typed, name-checked access to decoded values in layout order.
struct Fields(std::vec::IntoIter<(&'static str, FieldValue)>);

impl Fields {
    fn take(&mut self, name: &'static str) -> Result<FieldValue, ParseError> {
        match self.0.next() {
            Some((actual, value)) if actual == name => Ok(value),
            _ => Err(ParseError::InvalidField {
                field: name,
                reason: "layout out of sync with record",
            }),
        }
    }

    fn mismatch(name: &'static str) -> ParseError {
        ParseError::InvalidField {
            field: name,
            reason: "value does not match field kind",
        }
    }

    fn u8(&mut self, name: &'static str) -> Result<u8, ParseError> {
        match self.take(name)? {
            FieldValue::U8(v) => Ok(v),
            _ => Err(Self::mismatch(name)),
        }
    }

    fn u32(&mut self, name: &'static str) -> Result<u32, ParseError> {
        match self.take(name)? {
            FieldValue::U32(v) => Ok(v),
            _ => Err(Self::mismatch(name)),
        }
    }

    fn i32(&mut self, name: &'static str) -> Result<i32, ParseError> {
        match self.take(name)? {
            FieldValue::I32(v) => Ok(v),
            _ => Err(Self::mismatch(name)),
        }
    }

    fn bool(&mut self, name: &'static str) -> Result<bool, ParseError> {
        match self.take(name)? {
            FieldValue::Bool(v) => Ok(v),
            _ => Err(Self::mismatch(name)),
        }
    }

    fn volume_type(&mut self, name: &'static str) -> Result<VolumeType, ParseError> {
        match self.take(name)? {
            FieldValue::VolumeType(v) => Ok(v),
            _ => Err(Self::mismatch(name)),
        }
    }

    fn sentinel(&mut self, name: &'static str) -> Result<u8, ParseError> {
        match self.take(name)? {
            FieldValue::Sentinel(v) => Ok(v),
            _ => Err(Self::mismatch(name)),
        }
    }

    fn text(&mut self, name: &'static str) -> Result<String, ParseError> {
        match self.take(name)? {
            FieldValue::Text(v) => Ok(v),
            _ => Err(Self::mismatch(name)),
        }
    }

    fn u32_array<const N: usize>(&mut self, name: &'static str) -> Result<[u32; N], ParseError> {
        match self.take(name)? {
            FieldValue::U32Array(v) => v.try_into().map_err(|_| Self::mismatch(name)),
            _ => Err(Self::mismatch(name)),
        }
    }

    fn i32_array<const N: usize>(&mut self, name: &'static str) -> Result<[i32; N], ParseError> {
        match self.take(name)? {
            FieldValue::I32Array(v) => v.try_into().map_err(|_| Self::mismatch(name)),
            _ => Err(Self::mismatch(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afsvol_types::ErrorKind;

    fn sample() -> VolumeDiskData {
        VolumeDiskData {
            magic: VOLUME_INFO_MAGIC,
            version: 1,
            id: 536_870_915,
            name: "root.cell.readonly".to_owned(),
            in_use: false,
            in_service: true,
            blessed: true,
            needs_salvaged: false,
            uniquifier: 2_041,
            volume_type: VolumeType::ReadOnly,
            parent_id: 536_870_912,
            clone_id: 536_870_914,
            backup_id: 536_870_913,
            restored_from_id: 0,
            needs_callback: false,
            destroy_me: DESTROY_ME,
            dont_salvage: DONT_SALVAGE,
            reserveb3: 0,
            reserved1: [0; 6],
            max_quota: 5_000,
            min_quota: 0,
            max_files: 0,
            account_number: 0,
            owner: 0,
            reserved2: [0; 8],
            file_count: 12,
            disk_used: 9,
            day_use: 3,
            week_use: [1, 2, 3, 4, 5, 6, -7],
            day_use_date: 1_700_006_400,
            vol_update_counter: 88,
            reserved3: [0; 10],
            creation_date: 1_600_000_000,
            access_date: 1_700_000_000,
            update_date: 1_690_000_000,
            expiration_date: 0,
            backup_date: 1_695_000_000,
            copy_date: 1_600_000_100,
            stat_initialized: 1,
            reserved4: [0; 7],
            offline_message: "moved to fs2".to_owned(),
            stats: VolumeStats {
                reads: [10, 20, 30, 40],
                writes: [1, 2, 3, 4],
                file_same_author: [1, 0, 0, 0, 0, 5],
                file_diff_author: [0; 6],
                dir_same_author: [0, 0, 2, 0, 0, 0],
                dir_diff_author: [0; 6],
            },
        }
    }

    fn offset_of(name: &str) -> usize {
        field_offset(VOLUME_DISK_DATA_LAYOUT, name).expect("field in layout")
    }

    #[test]
    fn layout_size_matches_record() {
        assert_eq!(VOLUME_DISK_DATA_SIZE, 552);
        assert_eq!(offset_of("name"), 12);
        assert_eq!(offset_of("uniquifier"), 48);
        assert_eq!(offset_of("type"), 52);
        assert_eq!(offset_of("needs_callback"), 72);
        assert_eq!(offset_of("destroy_me"), 73);
        assert_eq!(offset_of("dont_salvage"), 74);
        assert_eq!(offset_of("reserved1"), 76);
        assert_eq!(offset_of("offline_message"), 296);
        assert_eq!(offset_of("stat_reads"), 424);
        assert_eq!(field_offset(VOLUME_DISK_DATA_LAYOUT, "motd"), None);
    }

    #[test]
    fn parse_sample_record() {
        let bytes = sample().to_bytes(ByteOrder::Little).expect("encode");
        assert_eq!(bytes.len(), VOLUME_DISK_DATA_SIZE);

        let parsed = VolumeDiskData::parse(&bytes, ByteOrder::Little).expect("parse");
        assert_eq!(parsed, sample());
        assert_eq!(parsed.name, "root.cell.readonly");
        assert_eq!(parsed.volume_type, VolumeType::ReadOnly);
        assert_eq!(parsed.week_use[6], -7);
        assert_eq!(parsed.stats.reads, [10, 20, 30, 40]);
        assert!(parsed.has_quota());
    }

    #[test]
    fn big_endian_record() {
        let bytes = sample().to_bytes(ByteOrder::Big).expect("encode");
        assert_eq!(&bytes[0..4], &VOLUME_INFO_MAGIC.to_be_bytes());
        let parsed = VolumeDiskData::parse(&bytes, ByteOrder::Big).expect("parse");
        assert_eq!(parsed, sample());
    }

    #[test]
    fn invalid_volume_type_rejected() {
        let mut bytes = sample().to_bytes(ByteOrder::Little).expect("encode");
        let at = offset_of("type");
        bytes[at..at + 4].copy_from_slice(&3_u32.to_le_bytes());
        let err = VolumeDiskData::parse(&bytes, ByteOrder::Little).unwrap_err();
        assert_eq!(err, ParseError::InvalidVolumeType(3));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn one_byte_too_long_is_format_error() {
        let mut bytes = sample().to_bytes(ByteOrder::Little).expect("encode");
        bytes.push(0);
        let err = VolumeDiskData::parse(&bytes, ByteOrder::Little).unwrap_err();
        assert_eq!(
            err,
            ParseError::TrailingData {
                expected: VOLUME_DISK_DATA_SIZE,
                actual: VOLUME_DISK_DATA_SIZE + 1,
            }
        );
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn short_record_is_format_error() {
        let bytes = sample().to_bytes(ByteOrder::Little).expect("encode");
        let err = VolumeDiskData::parse(&bytes[..VOLUME_DISK_DATA_SIZE - 1], ByteOrder::Little)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = sample().to_bytes(ByteOrder::Little).expect("encode");
        bytes[0] ^= 0xFF;
        let err = VolumeDiskData::parse(&bytes, ByteOrder::Little).unwrap_err();
        assert!(matches!(err, ParseError::InvalidMagic { .. }));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn sentinels_have_distinct_errors() {
        let clean = sample().to_bytes(ByteOrder::Little).expect("encode");

        let mut bytes = clean.clone();
        bytes[offset_of("destroy_me")] = 0;
        assert_eq!(
            VolumeDiskData::parse(&bytes, ByteOrder::Little).unwrap_err(),
            ParseError::BadDestroyMe(0)
        );

        let mut bytes = clean;
        bytes[offset_of("dont_salvage")] = 0xD3;
        assert_eq!(
            VolumeDiskData::parse(&bytes, ByteOrder::Little).unwrap_err(),
            ParseError::BadDontSalvage(0xD3)
        );
    }

    #[test]
    fn booleans_accept_any_nonzero_byte() {
        let mut bytes = sample().to_bytes(ByteOrder::Little).expect("encode");
        bytes[offset_of("in_use")] = 0x7F;
        bytes[offset_of("needs_callback")] = 0xFF;
        let parsed = VolumeDiskData::parse(&bytes, ByteOrder::Little).expect("parse");
        assert!(parsed.in_use);
        assert!(parsed.needs_callback);
    }

    #[test]
    fn text_without_nul_is_kept_whole() {
        let mut record = sample();
        record.name = "x".repeat(VNAME_SIZE + 8);
        let bytes = record.to_bytes(ByteOrder::Little).expect("encode");
        let parsed = VolumeDiskData::parse(&bytes, ByteOrder::Little).expect("parse");
        assert_eq!(parsed.name, "x".repeat(VNAME_SIZE));
    }

    #[test]
    fn text_stops_at_first_nul() {
        let mut bytes = sample().to_bytes(ByteOrder::Little).expect("encode");
        let at = offset_of("offline_message");
        bytes[at + 5] = 0;
        let parsed = VolumeDiskData::parse(&bytes, ByteOrder::Little).expect("parse");
        assert_eq!(parsed.offline_message, "moved");
    }

    #[test]
    fn reserved_arrays_preserved_verbatim() {
        let mut record = sample();
        record.reserved1 = [1, 2, 3, 4, 5, 6];
        record.reserved3 = [u32::MAX; 10];
        record.reserveb3 = 0x42;
        let bytes = record.to_bytes(ByteOrder::Little).expect("encode");
        let parsed = VolumeDiskData::parse(&bytes, ByteOrder::Little).expect("parse");
        assert_eq!(parsed.reserved1, [1, 2, 3, 4, 5, 6]);
        assert_eq!(parsed.reserved3, [u32::MAX; 10]);
        assert_eq!(parsed.reserveb3, 0x42);
    }

    #[test]
    fn decode_layout_reports_trailing_bytes() {
        let layout = [field("a", FieldKind::U32), field("b", FieldKind::Bool)];
        assert_eq!(layout_size(&layout), 5);

        let values = decode_layout(&layout, &[1, 0, 0, 0, 9], ByteOrder::Little).expect("decode");
        assert_eq!(values, vec![("a", FieldValue::U32(1)), ("b", FieldValue::Bool(true))]);

        assert_eq!(
            decode_layout(&layout, &[1, 0, 0, 0, 9, 9], ByteOrder::Little).unwrap_err(),
            ParseError::TrailingData {
                expected: 5,
                actual: 6,
            }
        );
        assert!(matches!(
            decode_layout(&layout, &[1, 0, 0, 0], ByteOrder::Little).unwrap_err(),
            ParseError::InsufficientData { .. }
        ));
    }

    #[test]
    fn encode_layout_rejects_misordered_values() {
        let layout = [field("a", FieldKind::U32), field("b", FieldKind::Bool)];
        let values = [("b", FieldValue::Bool(true)), ("a", FieldValue::U32(1))];
        assert!(encode_layout(&layout, &values, ByteOrder::Little).is_err());

        let wrong_kind = [("a", FieldValue::I32(1)), ("b", FieldValue::Bool(true))];
        assert!(encode_layout(&layout, &wrong_kind, ByteOrder::Little).is_err());
    }

    #[test]
    fn volume_type_display() {
        assert_eq!(VolumeType::ReadWrite.to_string(), "RW");
        assert_eq!(VolumeType::ReadOnly.to_string(), "RO");
        assert_eq!(VolumeType::Backup.to_string(), "BK");
        assert_eq!(VolumeType::from_raw(2), Ok(VolumeType::Backup));
    }

    #[test]
    fn field_value_display() {
        assert_eq!(FieldValue::Sentinel(DESTROY_ME).to_string(), "0xd3");
        assert_eq!(FieldValue::Text("root.afs".into()).to_string(), "\"root.afs\"");
        assert_eq!(FieldValue::I32Array(vec![-1, 0, 7]).to_string(), "[-1, 0, 7]");
        assert_eq!(FieldValue::U32Array(Vec::new()).to_string(), "[]");
        assert_eq!(FieldValue::VolumeType(VolumeType::ReadOnly).to_string(), "RO");
    }
}
