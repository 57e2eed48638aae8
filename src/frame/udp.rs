use byteorder::{ByteOrder, NetworkEndian};
use derivative::Derivative;

use crate::*;

#[derive(Derivative, Clone, Named)]
#[derivative(Debug)]
pub struct UDP {
    pub src: u16,
    pub dst: u16,
    pub len: u16,
    pub checksum: u16,
    #[derivative(Debug = "ignore")]
    pub payload: Vec<u8>,
}

impl UDP {
    pub fn new(data: &[u8]) -> Option<UDP> {
        let header = data.get(..8)?;
        Some(UDP {
            src: NetworkEndian::read_u16(&header[..2]),
            dst: NetworkEndian::read_u16(&header[2..4]),
            len: NetworkEndian::read_u16(&header[4..6]),
            checksum: NetworkEndian::read_u16(&header[6..8]),
            payload: data[8..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ports_and_payload() {
        let udp = UDP::new(&[0, 53, 0x14, 0xe9, 0, 10, 0, 0, b'h', b'i']).unwrap();
        assert_eq!((udp.src, udp.dst, udp.len), (53, 5353, 10));
        assert_eq!(udp.payload, b"hi");
        assert!(UDP::new(&[0; 7]).is_none());
    }
}
