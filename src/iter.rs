//! Record-by-record reading of a legacy capture with `pcap-parser`.
//!
//! Used to cross-check the parallel reader in [`crate::pcap`]; both must
//! produce the same packets for a well-formed file.

use std::fs::File;
use std::path::Path;

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, Linktype, PcapBlockOwned, PcapError as ReaderError};
use tracing::{debug, warn};

use crate::error::{PcapError, PcapFormatError, Result};
use crate::packet::{Packet, PacketHeader};

const BUFFER_SIZE: usize = 1 << 19;

pub struct SequentialPcap {
    reader: LegacyPcapReader<File>,
    snaplen: u32,
    link_type: Linktype,
    error: Option<PcapFormatError>,
    done: bool,
}

impl SequentialPcap {
    pub fn open(path: &Path) -> Result<SequentialPcap> {
        let file = File::open(path)
            .map_err(|source| PcapError::Open { path: path.to_path_buf(), source })?;
        let reader = LegacyPcapReader::new(BUFFER_SIZE, file)
            .map_err(|e| PcapError::Format {
                path: path.to_path_buf(),
                source: PcapFormatError::Reader(format!("{:?}", e)),
            })?;
        Ok(SequentialPcap { reader, snaplen: 0, link_type: Linktype::NULL, error: None, done: false })
    }

    /// Snap length from the global header, 0 before the first packet.
    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    pub fn link_type(&self) -> Linktype {
        self.link_type
    }

    /// The error that stopped iteration, if any.
    pub fn error(&self) -> Option<&PcapFormatError> {
        self.error.as_ref()
    }

    fn fail(&mut self, error: PcapFormatError) -> Option<Packet> {
        self.error = Some(error);
        self.done = true;
        None
    }
}

impl Iterator for SequentialPcap {
    type Item = Packet;

    fn next(&mut self) -> Option<Self::Item> {
        let mut stalled = false;
        while !self.done {
            match self.reader.next() {
                Ok((offset, block)) => {
                    let item = match block {
                        PcapBlockOwned::LegacyHeader(hdr) => {
                            debug!(snaplen = hdr.snaplen, network = %hdr.network, "pcap header");
                            self.snaplen = hdr.snaplen;
                            self.link_type = hdr.network;
                            None
                        }
                        PcapBlockOwned::Legacy(b) => Some(Packet {
                            header: PacketHeader {
                                ts_sec: b.ts_sec,
                                ts_usec: b.ts_usec,
                                incl_len: b.caplen,
                                orig_len: b.origlen,
                            },
                            data: b.data.to_vec(),
                        }),
                        PcapBlockOwned::NG(_) => {
                            return self.fail(PcapFormatError::Reader("unexpected pcapng block".into()));
                        }
                    };
                    self.reader.consume(offset);
                    stalled = false;
                    if item.is_some() {
                        return item;
                    }
                }
                Err(ReaderError::Eof) => self.done = true,
                Err(ReaderError::Incomplete) => {
                    if stalled {
                        warn!("truncated record at end of capture");
                        self.done = true;
                    } else if let Err(e) = self.reader.refill() {
                        let msg = format!("{:?}", e);
                        return self.fail(PcapFormatError::Reader(msg));
                    }
                    stalled = true;
                }
                Err(e) => {
                    let msg = format!("{:?}", e);
                    return self.fail(PcapFormatError::Reader(msg));
                }
            }
        }
        None
    }
}

/// Reads every packet of `path` in file order.
pub fn read_sequential(path: &Path) -> Result<Vec<Packet>> {
    let mut pcap = SequentialPcap::open(path)?;
    let packets: Vec<Packet> = pcap.by_ref().collect();
    match pcap.error {
        Some(source) => Err(PcapError::Format { path: path.to_path_buf(), source }.into()),
        None => Ok(packets),
    }
}
