use std::net::Ipv4Addr;

use byteorder::{ByteOrder, NetworkEndian};

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IPFlags {
    pub reserved: bool,
    pub df: bool,
    pub mf: bool,
}

/// Transport layer carried by an IPv4 datagram.
#[derive(Debug, Clone)]
pub enum Transport {
    Tcp(TCP),
    Udp(UDP),
    /// Another protocol, or a non-first fragment.
    Other,
}

#[derive(Debug, Clone, Named)]
pub struct IPv4 {
    pub ihl: u8,
    pub dscp: u8,
    pub ecn: u8,
    pub size: u16,
    pub id: u16,
    pub flags: IPFlags,
    pub fragments_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src: [u8; 4],
    pub dst: [u8; 4],
    pub transport: Transport,
}

impl IPv4 {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;

    /// Dissects an IPv4 header honoring IHL, or `None` if `data` is not one.
    pub fn new(data: &[u8]) -> Option<IPv4> {
        let version_ihl = *data.first()?;
        if version_ihl >> 4 != 4 {
            return None;
        }
        let ihl = version_ihl & 0x0F;
        let header_len = ihl as usize * 4;
        if header_len < 20 || data.len() < header_len {
            return None;
        }
        let dscp = data[1] >> 2;
        let ecn = data[1] & 0b0000_0011;
        let size = NetworkEndian::read_u16(&data[2..4]);
        let id = NetworkEndian::read_u16(&data[4..6]);
        let fragments_offset = NetworkEndian::read_u16(&data[6..8]);
        let flags = IPFlags {
            reserved: fragments_offset & 0x8000 > 0,
            df: fragments_offset & 0x4000 > 0,
            mf: fragments_offset & 0x2000 > 0,
        };
        let fragments_offset = fragments_offset & 0x1FFF;
        let protocol = data[9];
        // Ethernet padding may follow the datagram.
        let end = (size as usize).clamp(header_len, data.len());
        let payload = &data[header_len..end];
        let transport = if fragments_offset != 0 {
            Transport::Other
        } else {
            match protocol {
                Self::TCP => TCP::new(payload).map(Transport::Tcp),
                Self::UDP => UDP::new(payload).map(Transport::Udp),
                _ => None,
            }.unwrap_or(Transport::Other)
        };
        Some(IPv4 {
            ihl,
            dscp,
            ecn,
            size,
            id,
            flags,
            fragments_offset,
            ttl: data[8],
            protocol,
            checksum: NetworkEndian::read_u16(&data[10..12]),
            src: get_array!(data, 12..16)?,
            dst: get_array!(data, 16..20)?,
            transport,
        })
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.src)
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.dst)
    }

    /// Source and destination ports of the transport layer, if it has any.
    pub fn ports(&self) -> Option<(u16, u16)> {
        match &self.transport {
            Transport::Tcp(tcp) => Some((tcp.src, tcp.dst)),
            Transport::Udp(udp) => Some((udp.src, udp.dst)),
            Transport::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_utils::ipv4_frame;

    #[test]
    fn honors_ihl() {
        let plain = ipv4_frame(6, [192, 168, 0, 1], 4000, [8, 8, 8, 8], 443, b"hello");
        let mut ip = plain[14..34].to_vec();
        ip[0] = 0x46;
        let total = (plain.len() - 14 + 4) as u16;
        ip[2..4].copy_from_slice(&total.to_be_bytes());
        ip.extend_from_slice(&[1, 1, 0, 0]);
        ip.extend_from_slice(&plain[34..]);

        let ip = IPv4::new(&ip).unwrap();
        assert_eq!(ip.ihl, 6);
        assert_eq!(ip.ports(), Some((4000, 443)));
        assert_eq!(ip.src_addr().to_string(), "192.168.0.1");
        assert_eq!(ip.dst_addr().to_string(), "8.8.8.8");
        assert!(ip.flags.df);
    }

    #[test]
    fn trailing_padding_is_ignored() {
        let mut data = ipv4_frame(17, [1, 2, 3, 4], 7, [4, 3, 2, 1], 9, b"ab");
        data.extend_from_slice(&[0; 6]);
        let ip = IPv4::new(&data[14..]).unwrap();
        match ip.transport {
            Transport::Udp(udp) => assert_eq!(udp.payload, b"ab"),
            other => panic!("unexpected transport {:?}", other),
        }
    }

    #[test]
    fn later_fragments_have_no_ports() {
        let mut data = ipv4_frame(6, [1, 2, 3, 4], 7, [4, 3, 2, 1], 9, b"");
        data[14 + 6] = 0x00;
        data[14 + 7] = 0x10;
        let ip = IPv4::new(&data[14..]).unwrap();
        assert_eq!(ip.fragments_offset, 16);
        assert_eq!(ip.ports(), None);
    }

    #[test]
    fn rejects_non_ipv4() {
        assert!(IPv4::new(&[]).is_none());
        assert!(IPv4::new(&[0x60; 40]).is_none());
        assert!(IPv4::new(&[0x45; 19]).is_none());
        assert!(IPv4::new(&[0x44; 40]).is_none());
    }
}
