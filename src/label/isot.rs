use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::DateTime;
use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{info, warn};

use crate::error::LabelError;
use crate::label::{open_csv, Labeler, PacketInfo};
use crate::Named;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Classification {
    Benign,
    Malicious,
}

/// One row of the ISOT ground truth, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IsotItem {
    pub timestamp: String,
    pub protocol: String,
    pub source_ip: String,
    pub source_port: Option<u16>,
    pub dest_ip: String,
    pub dest_port: Option<u16>,
    pub size: String,
    pub fragmented: String,
    pub seq: String,
    pub ack: String,
    pub flags: String,
    pub classification: String,
}

impl IsotItem {
    /// Microseconds since the epoch of an RFC 3339 timestamp such as
    /// `2016-12-08T20:40:49.538528Z`.
    pub fn timestamp(value: &str) -> Result<i64, LabelError> {
        let t = DateTime::parse_from_rfc3339(value.trim())
            .map_err(|source| LabelError::BadTimestamp { value: value.to_string(), source })?;
        Ok(t.timestamp() * 1_000_000 + t.timestamp_subsec_micros() as i64)
    }

    pub fn micros(&self) -> Result<i64, LabelError> {
        Self::timestamp(&self.timestamp)
    }

    pub fn classification(&self) -> Result<Classification, LabelError> {
        Classification::from_str(&self.classification)
            .map_err(|_| LabelError::UnknownLabel(self.classification.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IsotKey {
    protocol: String,
    source_ip: String,
    source_port: u16,
    dest_ip: String,
    dest_port: u16,
    micros: i64,
}

impl IsotKey {
    fn of_packet(info: &PacketInfo) -> IsotKey {
        IsotKey {
            protocol: info.protocol_name().to_string(),
            source_ip: info.src_ip.clone(),
            source_port: info.src_port,
            dest_ip: info.dst_ip.clone(),
            dest_port: info.dst_port,
            micros: info.timestamp_micros(),
        }
    }
}

/// ISOT labeler: exact match on protocol, 5-tuple and microsecond timestamp.
#[derive(Debug, Default, Named)]
pub struct Isot {
    index: HashMap<IsotKey, Classification>,
}

impl Isot {
    /// Loads the ground-truth CSV, skipping its header row.
    pub fn from_path(path: &Path) -> Result<Isot, LabelError> {
        let mut reader = open_csv(path, true)?;
        let mut labeler = Isot::default();
        let mut duplicates = 0usize;
        for (i, record) in reader.records().enumerate() {
            let csv_err = |source| LabelError::Csv { path: path.to_path_buf(), source };
            let record = record.map_err(csv_err)?;
            if record.len() != 12 {
                return Err(LabelError::BadRow {
                    path: path.to_path_buf(),
                    row: i as u64 + 2,
                    reason: format!("expected 12 fields, found {}", record.len()),
                });
            }
            let item: IsotItem = record.deserialize(None).map_err(csv_err)?;
            if !labeler.insert(&item)? {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            warn!(path = %path.display(), duplicates, "duplicate ground-truth rows, keeping the first");
        }
        info!(path = %path.display(), rows = labeler.index.len(), "loaded {}", Self::name());
        Ok(labeler)
    }

    /// Adds `item`; returns false if its key was already present.
    pub fn insert(&mut self, item: &IsotItem) -> Result<bool, LabelError> {
        let key = IsotKey {
            protocol: item.protocol.to_ascii_uppercase(),
            source_ip: item.source_ip.clone(),
            source_port: item.source_port.unwrap_or(0),
            dest_ip: item.dest_ip.clone(),
            dest_port: item.dest_port.unwrap_or(0),
            micros: item.micros()?,
        };
        let classification = item.classification()?;
        match self.index.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => Ok(false),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(classification);
                Ok(true)
            }
        }
    }

    fn lookup(&self, info: &PacketInfo) -> Option<Classification> {
        self.index.get(&IsotKey::of_packet(info)).copied()
    }
}

impl Labeler for Isot {
    fn is_danger(&self, info: &PacketInfo) -> bool {
        self.lookup(info) == Some(Classification::Malicious)
    }

    fn packet_event_type(&self, info: &PacketInfo) -> String {
        self.lookup(info).unwrap_or(Classification::Benign).to_string()
    }

    fn labeler_name(&self) -> &'static str {
        Self::name()
    }
}
