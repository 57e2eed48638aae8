//! Whole-file pcap reader.
//!
//! The file is loaded into memory, the global header decoded, and the
//! packet-data region split into contiguous byte ranges, one per worker.
//! Each worker synchronizes on the first record of its range (see
//! [`sync`]) and parses records until its running offset passes the end of
//! the range; the per-range results are concatenated in range order.

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{PcapError, PcapFormatError, Result};
use crate::ngram::{Ngram, NgramOperator};
use crate::packet::{Packet, RECORD_HEADER_LEN};
use crate::util::{self, partition, Stopwatch};
use crate::ByteDecoder;

pub mod sync;
#[cfg(test)]
pub(crate) mod test_utils;

use sync::Region;

pub const GLOBAL_HEADER_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalHeader {
    /// Magic number as read in the file's own byte order.
    pub magic: u32,
    pub version_major: u16,
    pub version_minor: u16,
    pub thiszone: i32,
    pub sigfigs: u32,
    pub snaplen: u32,
    pub network: u32,
}

impl GlobalHeader {
    pub fn decode(data: &[u8]) -> Result<(GlobalHeader, ByteDecoder), PcapFormatError> {
        if data.len() < GLOBAL_HEADER_LEN {
            return Err(PcapFormatError::TruncatedHeader(data.len()));
        }
        let magic = [data[0], data[1], data[2], data[3]];
        let decoder = ByteDecoder::from_magic(magic)
            .ok_or(PcapFormatError::BadMagic(magic))?;
        let header = GlobalHeader {
            magic: decoder.u32(&data[0..4]),
            version_major: decoder.u16(&data[4..6]),
            version_minor: decoder.u16(&data[6..8]),
            thiszone: decoder.i32(&data[8..12]),
            sigfigs: decoder.u32(&data[12..16]),
            snaplen: decoder.u32(&data[16..20]),
            network: decoder.u32(&data[20..24]),
        };
        Ok((header, decoder))
    }

    pub fn encode(&self, decoder: ByteDecoder) -> [u8; GLOBAL_HEADER_LEN] {
        let mut buf = [0u8; GLOBAL_HEADER_LEN];
        decoder.write_u32(&mut buf[0..4], self.magic);
        decoder.write_u16(&mut buf[4..6], self.version_major);
        decoder.write_u16(&mut buf[6..8], self.version_minor);
        decoder.write_i32(&mut buf[8..12], self.thiszone);
        decoder.write_u32(&mut buf[12..16], self.sigfigs);
        decoder.write_u32(&mut buf[16..20], self.snaplen);
        decoder.write_u32(&mut buf[20..24], self.network);
        buf
    }
}

impl Default for GlobalHeader {
    fn default() -> Self {
        GlobalHeader {
            magic: ByteDecoder::MAGIC,
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen: 65535,
            network: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Drop ranges whose synchronization fails instead of failing the file.
    pub skip_bad_ranges: bool,
}

/// A fully parsed pcap file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcapFile {
    packets: Vec<Packet>,
    num_bytes: u64,
    header: GlobalHeader,
    byte_order: ByteDecoder,
}

impl PcapFile {
    pub fn read(path: &Path) -> Result<PcapFile> {
        Self::read_with(path, &ParseOptions::default())
    }

    pub fn read_with(path: &Path, options: &ParseOptions) -> Result<PcapFile> {
        let sw = Stopwatch::start("read pcap");
        let data = fs::read(path)
            .map_err(|source| PcapError::Open { path: path.to_path_buf(), source })?;
        let pcap = Self::parse(&data, options)
            .map_err(|source| PcapError::Format { path: path.to_path_buf(), source })?;
        sw.stop();
        debug!(path = %path.display(), packets = pcap.num_packets(), "parsed pcap");
        Ok(pcap)
    }

    /// Parses an in-memory capture.
    pub fn parse(data: &[u8], options: &ParseOptions) -> Result<PcapFile, PcapFormatError> {
        let (header, byte_order) = GlobalHeader::decode(data)?;
        let region = &data[GLOBAL_HEADER_LEN..];
        let packets = if region.is_empty() {
            Vec::new()
        } else {
            let first_ts = byte_order.u32_at(region, 0)
                .ok_or(PcapFormatError::TruncatedRecord {
                    offset: 0,
                    needed: RECORD_HEADER_LEN,
                    available: region.len(),
                })?;
            let region = Region { data: region, decoder: byte_order, snaplen: header.snaplen, first_ts };
            read_packets(&region, options, util::num_threads())?
        };
        Ok(PcapFile { packets, num_bytes: data.len() as u64, header, byte_order })
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn num_packets(&self) -> usize {
        self.packets.len()
    }

    pub fn num_bytes(&self) -> u64 {
        self.num_bytes
    }

    pub fn header(&self) -> &GlobalHeader {
        &self.header
    }

    pub fn snaplen(&self) -> u32 {
        self.header.snaplen
    }

    pub fn network(&self) -> u32 {
        self.header.network
    }

    pub fn byte_order(&self) -> ByteDecoder {
        self.byte_order
    }

    /// Runs `op` on every packet in parallel, resizing `out` to one slot per
    /// packet. `op` appends to the slot of its packet; earlier contents stay.
    pub fn apply_operator<T, F>(&self, op: F, out: &mut Vec<Vec<T>>)
        where
            T: Send,
            F: Fn(&Packet, &mut Vec<T>) + Sync,
    {
        let n = self.packets.len();
        if out.len() < n {
            out.resize_with(n, Vec::new);
        }
        if n == 0 {
            return;
        }
        let chunk = (n + util::num_threads() - 1) / util::num_threads();
        out[..n].par_chunks_mut(chunk)
            .zip(self.packets.par_chunks(chunk))
            .for_each(|(slots, packets)| {
                for (slot, packet) in slots.iter_mut().zip(packets) {
                    op(packet, slot);
                }
            });
    }

    pub fn apply_ngram_operator(&self, op: &NgramOperator, out: &mut Vec<Vec<Ngram>>) {
        self.apply_operator(|packet, slot| op.apply(packet, slot), out)
    }

    /// Per-packet tokens of every operator in `ops`, applied in order.
    pub fn ngrams(&self, ops: &[NgramOperator]) -> Vec<Vec<Ngram>> {
        let mut out = Vec::new();
        for op in ops {
            self.apply_ngram_operator(op, &mut out);
        }
        out.resize_with(self.packets.len(), Vec::new);
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        util::save_archive(self, path)
    }

    pub fn load(path: &Path) -> Result<PcapFile> {
        util::load_archive(path)
    }
}

/// Worker count for a region: the configured count, unless that would make
/// ranges shorter than a snapshot.
fn worker_count(workers: usize, region_len: usize, snaplen: u32) -> usize {
    if region_len / workers < snaplen as usize {
        (region_len / (snaplen as usize + 1)).clamp(1, workers)
    } else {
        workers
    }
}

fn read_packets(region: &Region<'_>, options: &ParseOptions, threads: usize) -> Result<Vec<Packet>, PcapFormatError> {
    let workers = worker_count(threads, region.data.len(), region.snaplen);
    let ranges = partition(region.data.len(), workers);
    debug!(workers, bytes = region.data.len(), "reading packet records");

    let results: Vec<_> = ranges.par_iter()
        .map(|range| region.parse_range(range))
        .collect();

    let mut packets = Vec::new();
    // Offset where the previous range's walk stopped, if it succeeded.
    let mut covered: Option<usize> = Some(0);
    for (range, result) in ranges.into_iter().zip(results) {
        if matches!(covered, Some(c) if c >= range.end) {
            // The previous range's last record spans this whole range.
            continue;
        }
        let part = match result {
            Ok(part) => part,
            Err(e) if options.skip_bad_ranges => {
                error!(?range, "skipping range: {}", e);
                covered = None;
                continue;
            }
            Err(e) => return Err(e),
        };
        if let (Some(c), Some(start)) = (covered, part.start) {
            if c != start {
                let e = PcapFormatError::ConflictingCandidates { range: range.clone(), candidates: vec![c, start] };
                if options.skip_bad_ranges {
                    error!(?range, "skipping range: {}", e);
                    covered = None;
                    continue;
                }
                return Err(e);
            }
        }
        covered = Some(part.next);
        packets.extend(part.packets);
        if let Some(truncated) = part.truncated {
            // Later ranges lie inside the partial record.
            warn!("{}", truncated);
            break;
        }
    }
    Ok(packets)
}
