use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::info;

use crate::config::OutputDir;
use crate::error::{Error, LabelError, Result};
use crate::label::{Labeler, PacketInfo};
use crate::pcap::PcapFile;
use crate::util;

/// Sub-directory of an output directory holding per-packet labels.
pub const LABELS_DIR: &str = "labels";

pub fn packet_infos(pcap: &PcapFile) -> Result<Vec<PacketInfo>, LabelError> {
    pcap.packets().par_iter().map(PacketInfo::from_packet).collect()
}

/// 1 for every packet the labeler flags as dangerous, else 0.
pub fn generate_y(pcap: &PcapFile, labeler: &dyn Labeler) -> Result<Vec<u8>, LabelError> {
    pcap.packets().par_iter()
        .map(|p| PacketInfo::from_packet(p).map(|info| labeler.is_danger(&info) as u8))
        .collect()
}

/// Event type of every packet.
pub fn attacks(pcap: &PcapFile, labeler: &dyn Labeler) -> Result<Vec<String>, LabelError> {
    pcap.packets().par_iter()
        .map(|p| PacketInfo::from_packet(p).map(|info| labeler.packet_event_type(&info)))
        .collect()
}

/// Per-packet token ids padded with zeros to the longest packet.
pub fn generate_x_tokens(nested: &[Vec<u64>]) -> Vec<Vec<u64>> {
    let width = nested.iter().map(Vec::len).max().unwrap_or(0);
    nested.par_iter()
        .map(|ids| {
            let mut row = Vec::with_capacity(width);
            row.extend_from_slice(ids);
            row.resize(width, 0);
            row
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSummary {
    pub files: usize,
    pub packets: u64,
    pub dangerous: u64,
    /// Packets per event type.
    pub events: BTreeMap<String, u64>,
}

/// Labels every archived capture under `output_dir/pcaps`, writing one
/// byte per packet to `output_dir/labels/<stem>.bin`.
pub fn label_directory(output_dir: &Path, labeler: &dyn Labeler) -> Result<LabelSummary> {
    let pcaps_dir = output_dir.join(OutputDir::Pcaps.as_ref());
    let labels_dir = output_dir.join(LABELS_DIR);
    fs::create_dir_all(&labels_dir).map_err(|e| Error::io(&labels_dir, e))?;

    let mut archives: Vec<PathBuf> = fs::read_dir(&pcaps_dir)
        .map_err(|e| Error::io(&pcaps_dir, e))?
        .map(|entry| entry.map(|e| e.path()).map_err(|e| Error::io(&pcaps_dir, e)))
        .collect::<Result<_>>()?;
    archives.retain(|p| p.extension().map_or(false, |ext| ext == "bin"));
    archives.sort();

    let mut summary = LabelSummary::default();
    for archive in &archives {
        let pcap = PcapFile::load(archive)?;
        let y = generate_y(&pcap, labeler)?;
        for event in attacks(&pcap, labeler)? {
            *summary.events.entry(event).or_default() += 1;
        }
        let stem = archive.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let path = labels_dir.join(format!("{}.bin", stem));
        util::write_atomic(&path, |w| w.write_all(&y).map_err(|e| Error::io(&path, e)))?;

        let dangerous = y.iter().filter(|&&b| b == 1).count() as u64;
        info!(file = %archive.display(), packets = y.len(), dangerous, labeler = labeler.labeler_name(), "labeled");
        summary.files += 1;
        summary.packets += y.len() as u64;
        summary.dangerous += dangerous;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_utils::ipv4_frame;
    use crate::pcap::test_utils::PcapBuilder;
    use crate::pcap::ParseOptions;
    use crate::ByteDecoder;

    /// Flags TCP packets to port 80.
    struct Port80;

    impl Labeler for Port80 {
        fn is_danger(&self, info: &PacketInfo) -> bool {
            info.protocol == 6 && info.dst_port == 80
        }

        fn packet_event_type(&self, info: &PacketInfo) -> String {
            if self.is_danger(info) { "web".into() } else { "Benign".into() }
        }

        fn labeler_name(&self) -> &'static str {
            "Port80"
        }
    }

    fn capture() -> PcapFile {
        let bytes = PcapBuilder::new(ByteDecoder::Little)
            .packet(1_600_000_000, 0, &ipv4_frame(6, [10, 0, 0, 1], 999, [10, 0, 0, 2], 80, b"GET"))
            .packet(1_600_000_001, 0, &ipv4_frame(17, [10, 0, 0, 1], 999, [10, 0, 0, 2], 80, b"dns"))
            .packet(1_600_000_002, 0, &ipv4_frame(6, [10, 0, 0, 2], 80, [10, 0, 0, 1], 999, b"200"))
            .build();
        PcapFile::parse(&bytes, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn labels_and_event_types() {
        let pcap = capture();
        assert_eq!(generate_y(&pcap, &Port80).unwrap(), vec![1, 0, 0]);
        assert_eq!(attacks(&pcap, &Port80).unwrap(), vec!["web", "Benign", "Benign"]);
        assert_eq!(packet_infos(&pcap).unwrap()[2].src_port, 80);
    }

    #[test]
    fn x_tokens_are_zero_padded() {
        let x = generate_x_tokens(&[vec![1, 2, 3], vec![], vec![4]]);
        assert_eq!(x, vec![vec![1, 2, 3], vec![0, 0, 0], vec![4, 0, 0]]);
        assert!(generate_x_tokens(&[]).is_empty());
    }

    #[test]
    fn labels_every_archive() {
        let dir = tempfile::tempdir().unwrap();
        let pcaps = dir.path().join("pcaps");
        fs::create_dir(&pcaps).unwrap();
        capture().save(&pcaps.join("day1.bin")).unwrap();

        let summary = label_directory(dir.path(), &Port80).unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(summary.packets, 3);
        assert_eq!(summary.dangerous, 1);
        assert_eq!(summary.events.get("Benign"), Some(&2));
        assert_eq!(fs::read(dir.path().join("labels/day1.bin")).unwrap(), vec![1, 0, 0]);
    }
}
