use derivative::Derivative;
use serde::{Deserialize, Serialize};

use crate::ByteDecoder;

/// Size of a pcap record header in bytes.
pub const RECORD_HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketHeader {
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub incl_len: u32,
    pub orig_len: u32,
}

impl PacketHeader {
    /// Decodes a record header from its 16 bytes.
    pub fn decode(data: &[u8], decoder: ByteDecoder) -> PacketHeader {
        PacketHeader {
            ts_sec: decoder.u32(&data[0..4]),
            ts_usec: decoder.u32(&data[4..8]),
            incl_len: decoder.u32(&data[8..12]),
            orig_len: decoder.u32(&data[12..16]),
        }
    }

    pub fn encode(&self, decoder: ByteDecoder) -> [u8; RECORD_HEADER_LEN] {
        let mut buf = [0u8; RECORD_HEADER_LEN];
        decoder.write_u32(&mut buf[0..4], self.ts_sec);
        decoder.write_u32(&mut buf[4..8], self.ts_usec);
        decoder.write_u32(&mut buf[8..12], self.incl_len);
        decoder.write_u32(&mut buf[12..16], self.orig_len);
        buf
    }
}

#[derive(Derivative, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Debug)]
pub struct Packet {
    pub header: PacketHeader,
    #[derivative(Debug = "ignore")]
    pub data: Vec<u8>,
}

impl Packet {
    /// Reads the record starting at `offset`, or `None` if its header or
    /// payload runs past the end of `data`.
    pub fn read(data: &[u8], offset: usize, decoder: ByteDecoder) -> Option<Packet> {
        let header = data.get(offset..offset.checked_add(RECORD_HEADER_LEN)?)?;
        let header = PacketHeader::decode(header, decoder);
        let start = offset + RECORD_HEADER_LEN;
        let payload = data.get(start..start.checked_add(header.incl_len as usize)?)?;
        Some(Packet { header, data: payload.to_vec() })
    }

    /// Bytes the record occupies in the file.
    pub fn stride(&self) -> usize {
        RECORD_HEADER_LEN + self.header.incl_len as usize
    }

    pub fn ts_sec(&self) -> u32 {
        self.header.ts_sec
    }

    pub fn ts_usec(&self) -> u32 {
        self.header.ts_usec
    }

    pub fn incl_len(&self) -> u32 {
        self.header.incl_len
    }

    pub fn orig_len(&self) -> u32 {
        self.header.orig_len
    }

    pub fn ts(&self) -> f64 {
        self.header.ts_sec as f64 + self.header.ts_usec as f64 * 0.000001
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_one_record() {
        let header = PacketHeader { ts_sec: 7, ts_usec: 8, incl_len: 3, orig_len: 60 };
        let mut bytes = header.encode(ByteDecoder::Little).to_vec();
        bytes.extend_from_slice(b"abc");
        bytes.extend_from_slice(b"trailing");

        let packet = Packet::read(&bytes, 0, ByteDecoder::Little).unwrap();
        assert_eq!(packet.header, header);
        assert_eq!(packet.data, b"abc");
        assert_eq!(packet.stride(), 19);
    }

    #[test]
    fn refuses_short_payload() {
        let header = PacketHeader { ts_sec: 7, ts_usec: 8, incl_len: 10, orig_len: 10 };
        let mut bytes = header.encode(ByteDecoder::Big).to_vec();
        bytes.extend_from_slice(b"short");
        assert!(Packet::read(&bytes, 0, ByteDecoder::Big).is_none());
        assert!(Packet::read(&bytes[..12], 0, ByteDecoder::Big).is_none());
    }
}
