//! Error types for pcap2vec.
//!
//! - [`enum@Error`] wraps every error the library returns
//! - [`PcapError`] / [`PcapFormatError`] come from the pcap reader
//! - [`DictionaryError`] signals a phase violation on a [`CountDictionary`](crate::CountDictionary)
//! - [`LabelError`] comes from ground-truth labelers
//! - [`ArchiveError`] wraps persistence failures
//! - [`ConfigError`] comes from pipeline configuration

use std::ops::Range;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("pcap error: {0}")]
    Pcap(#[from] PcapError),

    #[error("dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),

    #[error("labeler error: {0}")]
    Label(#[from] LabelError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

#[derive(Error, Debug)]
pub enum PcapError {
    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: PcapFormatError,
    },
}

/// Structural problems found while reconstructing the packet stream.
///
/// Offsets are relative to the start of the packet-data region, i.e. the
/// byte right after the 24-byte global header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PcapFormatError {
    #[error("magic number {0:02x?} is neither a1b2c3d4 nor d4c3b2a1")]
    BadMagic([u8; 4]),

    #[error("global header truncated: {0} of 24 bytes")]
    TruncatedHeader(usize),

    #[error("record at offset {offset} truncated: needs {needed} bytes, {available} available")]
    TruncatedRecord {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("no candidate record boundary in byte range {range:?}")]
    NoCandidates { range: Range<usize> },

    #[error("unchained candidate record boundaries {candidates:?} in byte range {range:?}")]
    ConflictingCandidates {
        range: Range<usize>,
        candidates: Vec<usize>,
    },

    #[error("sequential reader: {0}")]
    Reader(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryError {
    #[error("translate called before finalize")]
    NotFinalized,

    #[error("dictionary already finalized")]
    AlreadyFinalized,
}

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("could not open label file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("label file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("label file {path}, row {row}: {reason}")]
    BadRow {
        path: PathBuf,
        row: u64,
        reason: String,
    },

    #[error("unknown label value {0:?}")]
    UnknownLabel(String),

    #[error("unparseable timestamp {value:?}: {source}")]
    BadTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("timestamp fraction {0} exceeds 999999 microseconds")]
    Microseconds(u32),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("{path}: {source}")]
    Bincode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("{path}: length {len} is not a multiple of 8")]
    Misaligned { path: PathBuf, len: u64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Ron {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("invalid include pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("{0}")]
    Invalid(String),
}
