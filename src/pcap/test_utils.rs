use crate::packet::PacketHeader;
use crate::pcap::GlobalHeader;
use crate::ByteDecoder;

/// Writes small legacy pcap captures in either byte order.
pub struct PcapBuilder {
    decoder: ByteDecoder,
    header: GlobalHeader,
    records: Vec<u8>,
}

impl PcapBuilder {
    pub fn new(decoder: ByteDecoder) -> Self {
        PcapBuilder { decoder, header: GlobalHeader::default(), records: Vec::new() }
    }

    pub fn snaplen(mut self, snaplen: u32) -> Self {
        self.header.snaplen = snaplen;
        self
    }

    pub fn packet(mut self, ts_sec: u32, ts_usec: u32, payload: &[u8]) -> Self {
        let header = PacketHeader {
            ts_sec,
            ts_usec,
            incl_len: payload.len() as u32,
            orig_len: payload.len() as u32,
        };
        self.records.extend_from_slice(&header.encode(self.decoder));
        self.records.extend_from_slice(payload);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = self.header.encode(self.decoder).to_vec();
        bytes.extend_from_slice(&self.records);
        bytes
    }
}
