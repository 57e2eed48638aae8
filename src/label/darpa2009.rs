use std::collections::HashMap;
use std::path::Path;

use chrono::Duration;
use tracing::info;

use crate::error::LabelError;
use crate::label::{open_csv, Labeler, PacketInfo};
use crate::time::utc_seconds_from_datetime;
use crate::Named;

/// Ground-truth times are written in EST.
const EST_TO_UTC_HOURS: i64 = 5;

/// One malicious interval of the DARPA 2009 ground truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Darpa2009Item {
    pub event_type: String,
    pub c2s: String,
    pub source_ip: String,
    pub source_port: String,
    pub dest_ip: String,
    pub dest_port: String,
    pub start: i64,
    pub stop: i64,
}

/// DARPA 2009 labeler, indexed by source IP.
#[derive(Debug, Default, Named)]
pub struct Darpa2009 {
    source_ip_index: HashMap<String, Vec<Darpa2009Item>>,
}

/// UTC epoch seconds of a `%m/%d/%Y %H:%M` ground-truth time.
pub fn string_to_epoch(s: &str) -> Result<i64, LabelError> {
    let est = utc_seconds_from_datetime(s, "%m/%d/%Y %H:%M")?;
    Ok(est + Duration::hours(EST_TO_UTC_HOURS).num_seconds())
}

impl Darpa2009 {
    /// Loads the header-less ground-truth CSV.
    pub fn from_path(path: &Path) -> Result<Darpa2009, LabelError> {
        let mut reader = open_csv(path, false)?;
        let mut labeler = Darpa2009::default();
        let mut rows = 0;
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|source| LabelError::Csv { path: path.to_path_buf(), source })?;
            let bad_row = |reason: String| LabelError::BadRow { path: path.to_path_buf(), row: i as u64 + 1, reason };
            if record.len() != 8 {
                return Err(bad_row(format!("expected 8 fields, found {}", record.len())));
            }
            let item = Darpa2009Item {
                event_type: record[0].to_string(),
                c2s: record[1].to_string(),
                source_ip: record[2].to_string(),
                source_port: record[3].to_string(),
                dest_ip: record[4].to_string(),
                dest_port: record[5].to_string(),
                start: string_to_epoch(&record[6])?,
                stop: string_to_epoch(&record[7])?,
            };
            labeler.insert(item);
            rows += 1;
        }
        info!(path = %path.display(), rows, "loaded {}", Self::name());
        Ok(labeler)
    }

    pub fn insert(&mut self, item: Darpa2009Item) {
        self.source_ip_index.entry(item.source_ip.clone()).or_default().push(item);
    }

    fn matching(&self, info: &PacketInfo) -> Option<&Darpa2009Item> {
        let seconds = info.seconds as i64;
        self.source_ip_index.get(&info.src_ip)?
            .iter()
            .find(|item| item.dest_ip == info.dst_ip && item.start <= seconds && seconds <= item.stop)
    }
}

impl Labeler for Darpa2009 {
    fn is_danger(&self, info: &PacketInfo) -> bool {
        self.matching(info).is_some()
    }

    fn packet_event_type(&self, info: &PacketInfo) -> String {
        self.matching(info)
            .map_or_else(|| "Benign".to_string(), |item| item.event_type.clone())
    }

    fn labeler_name(&self) -> &'static str {
        Self::name()
    }
}
