#![forbid(unsafe_code)]
//! Error types for the afsvol tools.
//!
//! # Error Taxonomy
//!
//! Errors come in two layers:
//!
//! | Layer | Type | Crate | Purpose |
//! |-------|------|-------|---------|
//! | Parsing | `ParseError` | `afsvol-types` | Byte-level format violations and digit-encoding domain errors |
//! | Runtime | `AfsError` | `afsvol-error` (this crate) | Errors surfaced to the CLI and library callers, with file context |
//!
//! ## Mapping Policy: ParseError → AfsError
//!
//! This crate does not depend on `afsvol-types`. The conversion lives in
//! `afsvol-core`, which sees both types and knows which file was being read.
//! The rule is one-to-one on the parse-layer kind:
//!
//! | ParseError kind | AfsError Variant | Examples |
//! |-----------------|------------------|----------|
//! | `Format` | `Format(detail)` | 75-byte header, volume-info file with trailing bytes |
//! | `Validation` | `Validation(detail)` | bad magic, unknown version, volume type 3, sentinel mismatch, shard mismatch |
//! | `Domain` | `Domain(detail)` | negative value passed to the digit encoder, digit outside the alphabet |
//!
//! The detail string carries the file path when one is known.
//!
//! ## Exit Status
//!
//! [`AfsError::kind`] groups variants into [`Kind`], and [`Kind::exit_code`]
//! gives the CLI exit status for each group:
//!
//! | Variant | Kind | Exit code |
//! |---------|------|-----------|
//! | `Io` | `Io` | 74 |
//! | `NotFound` | `Io` | 74 |
//! | `NoPartitions` | `Io` | 74 |
//! | `Format` | `Data` | 65 |
//! | `Validation` | `Data` | 65 |
//! | `Domain` | `Usage` | 64 |
//! | `Usage` | `Usage` | 64 |

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AfsError {
    /// Reading a file or directory failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record has the wrong size.
    #[error("invalid record format: {0}")]
    Format(String),

    /// A record has the right size but violates a content invariant.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A value is outside an operation's domain.
    #[error("value out of domain: {0}")]
    Domain(String),

    /// An expected file (usually a volume-info object) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Partition discovery found no `vicep*` directory.
    #[error("no vicep partitions under {}", .0.display())]
    NoPartitions(PathBuf),

    /// Bad command-line input.
    #[error("usage: {0}")]
    Usage(String),
}

/// Coarse grouping of [`AfsError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Io,
    Data,
    Usage,
}

impl Kind {
    /// sysexits-style process exit status.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Usage => 64,
            Self::Data => 65,
            Self::Io => 74,
        }
    }
}

impl AfsError {
    /// Wrap an I/O error with the path that produced it.
    ///
    /// `ErrorKind::NotFound` becomes [`AfsError::NotFound`].
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound(path.display().to_string());
        }
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Io { .. } | Self::NotFound(_) | Self::NoPartitions(_) => Kind::Io,
            Self::Format(_) | Self::Validation(_) => Kind::Data,
            Self::Domain(_) | Self::Usage(_) => Kind::Usage,
        }
    }
}

pub type Result<T> = std::result::Result<T, AfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_covers_all_variants() {
        let cases: Vec<(AfsError, Kind)> = vec![
            (
                AfsError::Io {
                    path: PathBuf::from("/vicepa"),
                    source: std::io::Error::other("boom"),
                },
                Kind::Io,
            ),
            (AfsError::NotFound("x".into()), Kind::Io),
            (AfsError::NoPartitions(PathBuf::from("/")), Kind::Io),
            (AfsError::Format("x".into()), Kind::Data),
            (AfsError::Validation("x".into()), Kind::Data),
            (AfsError::Domain("x".into()), Kind::Usage),
            (AfsError::Usage("x".into()), Kind::Usage),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [Kind::Io, Kind::Data, Kind::Usage].map(Kind::exit_code);
        assert_eq!(codes, [74, 65, 64]);
    }

    #[test]
    fn io_helper_maps_missing_files() {
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        let err = AfsError::io("/vicepa/V0536870912.vol", missing);
        assert!(matches!(err, AfsError::NotFound(ref p) if p == "/vicepa/V0536870912.vol"));

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let err = AfsError::io("/vicepa", denied);
        assert!(matches!(err, AfsError::Io { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn display_formatting() {
        let err = AfsError::Io {
            path: PathBuf::from("/vicepa/V0000000007.vol"),
            source: std::io::Error::other("short read"),
        };
        assert_eq!(
            err.to_string(),
            "I/O error on /vicepa/V0000000007.vol: short read"
        );
        assert_eq!(
            AfsError::NoPartitions(PathBuf::from("/srv")).to_string(),
            "no vicep partitions under /srv"
        );
        assert_eq!(
            AfsError::Validation("bad magic".into()).to_string(),
            "validation failed: bad magic"
        );
    }
}
