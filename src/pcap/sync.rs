//! Candidate synchronization.
//!
//! A worker handed the byte range `[beg, end)` of the packet-data region
//! does not know where the first record inside it starts. Every position in
//! the first `snaplen + 16` bytes whose would-be `ts_sec` is not older than
//! the capture's first timestamp is a candidate; a candidate survives if
//! [`N_DESIRED`] consecutive records can be walked from it. Survivors must all
//! belong to one chain, the first of which is the range's start.

use std::ops::Range;

use tracing::trace;

use crate::error::PcapFormatError;
use crate::packet::{Packet, RECORD_HEADER_LEN};
use crate::ByteDecoder;

/// Records that must chain from a candidate before it is believed.
pub const N_DESIRED: usize = 10;

/// The packet-data region of one file, i.e. everything after the global header.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a> {
    pub data: &'a [u8],
    pub decoder: ByteDecoder,
    pub snaplen: u32,
    pub first_ts: u32,
}

/// Packets a worker reconstructed from its range.
#[derive(Debug, Default)]
pub struct RangeParse {
    /// Offset of the first record parsed, `None` for an empty range.
    pub start: Option<usize>,
    pub packets: Vec<Packet>,
    /// Offset right after the last record parsed.
    pub next: usize,
    /// Set when the walk stopped at a record running past the region.
    pub truncated: Option<PcapFormatError>,
}

impl<'a> Region<'a> {
    fn ts_at(&self, offset: usize) -> Option<u32> {
        self.decoder.u32_at(self.data, offset)
    }

    fn incl_len_at(&self, offset: usize) -> Option<u32> {
        self.decoder.u32_at(self.data, offset.checked_add(8)?)
    }

    /// Offsets in the head of `range` that could hold a record's `ts_sec`.
    pub fn candidates(&self, range: &Range<usize>) -> Vec<usize> {
        let window = self.snaplen as usize + RECORD_HEADER_LEN;
        let scan_end = range.start.saturating_add(window).min(range.end);
        (range.start..scan_end)
            .filter(|&i| self.ts_at(i).map_or(false, |ts| ts >= self.first_ts))
            .collect()
    }

    /// Walks up to [`N_DESIRED`] records from `start`. Landing exactly on the
    /// end of the region confirms the chain early, and so does a valid header
    /// whose payload runs past it: that record is the truncated tail.
    pub fn walk(&self, start: usize) -> bool {
        let end = self.data.len();
        let mut index = start;
        let mut previous = self.first_ts;
        for _ in 0..N_DESIRED {
            if index == end {
                return true;
            }
            let (ts, incl_len) = match (self.ts_at(index), self.incl_len_at(index)) {
                (Some(ts), Some(len)) => (ts, len),
                _ => return false,
            };
            if ts < previous || incl_len > self.snaplen {
                return false;
            }
            index = match index.checked_add(RECORD_HEADER_LEN + incl_len as usize) {
                Some(next) if next <= end => next,
                _ => return true,
            };
            previous = ts;
        }
        true
    }

    /// Offset of the first record starting inside `range`.
    ///
    /// The range at offset 0 is anchored: the first record follows the
    /// global header directly.
    pub fn find_start(&self, range: &Range<usize>) -> Result<Option<usize>, PcapFormatError> {
        if range.is_empty() {
            return Ok(None);
        }
        if range.start == 0 {
            return Ok(Some(0));
        }
        let candidates = self.candidates(range);
        let survivors: Vec<usize> = candidates.into_iter()
            .filter(|&c| self.walk(c))
            .collect();
        trace!(?range, ?survivors, "candidate synchronization");
        let first = match survivors.first() {
            Some(&first) => first,
            None => return Err(PcapFormatError::NoCandidates { range: range.clone() }),
        };
        for pair in survivors.windows(2) {
            let explained = self.incl_len_at(pair[0])
                .map(|len| pair[0] + RECORD_HEADER_LEN + len as usize);
            if explained != Some(pair[1]) {
                return Err(PcapFormatError::ConflictingCandidates {
                    range: range.clone(),
                    candidates: survivors,
                });
            }
        }
        Ok(Some(first))
    }

    /// Parses records from `start` until the running offset reaches `end`.
    pub fn parse_from(&self, start: usize, end: usize) -> RangeParse {
        let mut index = start;
        let mut packets = Vec::new();
        let mut truncated = None;
        while index < end {
            match Packet::read(self.data, index, self.decoder) {
                Some(packet) => {
                    index += packet.stride();
                    packets.push(packet);
                }
                None => {
                    let needed = self.incl_len_at(index)
                        .map_or(RECORD_HEADER_LEN, |len| RECORD_HEADER_LEN + len as usize);
                    truncated = Some(PcapFormatError::TruncatedRecord {
                        offset: index,
                        needed,
                        available: self.data.len() - index,
                    });
                    break;
                }
            }
        }
        RangeParse { start: Some(start), packets, next: index, truncated }
    }

    /// Synchronizes on `range` and parses its records.
    pub fn parse_range(&self, range: &Range<usize>) -> Result<RangeParse, PcapFormatError> {
        match self.find_start(range)? {
            Some(start) => Ok(self.parse_from(start, range.end)),
            None => Ok(RangeParse { next: range.start, ..Default::default() }),
        }
    }
}
