use byteorder::{ByteOrder, NetworkEndian};
use derivative::Derivative;

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TCPFlags {
    pub ns: bool,
    pub cwr: bool,
    pub ece: bool,
    pub urg: bool,
    pub ack: bool,
    pub psh: bool,
    pub rst: bool,
    pub syn: bool,
    pub fin: bool,
}

#[derive(Derivative, Clone, Named)]
#[derivative(Debug)]
pub struct TCP {
    pub src: u16,
    pub dst: u16,
    pub sn: u32,
    pub ack_sn: u32,
    pub header_len: u8,
    pub flags: TCPFlags,
    pub window_size: u16,
    pub checksum: u16,
    pub urgent_point: u16,
    pub options: Vec<u8>,
    #[derivative(Debug = "ignore")]
    pub payload: Vec<u8>,
}

impl TCP {
    pub fn new(data: &[u8]) -> Option<TCP> {
        let header_len = (data.get(12)? & 0b1111_0000) >> 4;
        let data_offset = header_len as usize * 4;
        if data_offset < 20 || data.len() < data_offset {
            return None;
        }
        let flags = NetworkEndian::read_u16(&data[12..14]);
        let flags = TCPFlags {
            ns: flags & 0b0000_0001_0000_0000 > 0,
            cwr: flags & 0b0000_0000_1000_0000 > 0,
            ece: flags & 0b0000_0000_0100_0000 > 0,
            urg: flags & 0b0000_0000_0010_0000 > 0,
            ack: flags & 0b0000_0000_0001_0000 > 0,
            psh: flags & 0b0000_0000_0000_1000 > 0,
            rst: flags & 0b0000_0000_0000_0100 > 0,
            syn: flags & 0b0000_0000_0000_0010 > 0,
            fin: flags & 0b0000_0000_0000_0001 > 0,
        };
        Some(TCP {
            src: NetworkEndian::read_u16(&data[..2]),
            dst: NetworkEndian::read_u16(&data[2..4]),
            sn: NetworkEndian::read_u32(&data[4..8]),
            ack_sn: NetworkEndian::read_u32(&data[8..12]),
            header_len,
            flags,
            window_size: NetworkEndian::read_u16(&data[14..16]),
            checksum: NetworkEndian::read_u16(&data[16..18]),
            urgent_point: NetworkEndian::read_u16(&data[18..20]),
            options: data[20..data_offset].to_vec(),
            payload: data[data_offset..].to_vec(),
        })
    }

    pub fn is_tail_of_sequence(&self) -> bool {
        self.flags.psh | self.flags.fin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_with_options() {
        let mut data = vec![0x1f, 0x90, 0x00, 0x50, 0, 0, 0, 9, 0, 0, 0, 3, 0x60, 0x18, 0x01, 0x00, 0, 0, 0, 0];
        data.extend_from_slice(&[2, 4, 5, 0xb4]);
        data.extend_from_slice(b"body");
        let tcp = TCP::new(&data).unwrap();
        assert_eq!((tcp.src, tcp.dst), (8080, 80));
        assert_eq!((tcp.sn, tcp.ack_sn), (9, 3));
        assert_eq!(tcp.header_len, 6);
        assert_eq!(tcp.options, vec![2, 4, 5, 0xb4]);
        assert_eq!(tcp.payload, b"body");
        assert!(tcp.flags.ack && tcp.flags.psh && !tcp.flags.syn);
        assert!(tcp.is_tail_of_sequence());
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(TCP::new(&[0; 12]).is_none());
        let mut data = vec![0u8; 20];
        data[12] = 0x80;
        assert!(TCP::new(&data).is_none());
    }
}
