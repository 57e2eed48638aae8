use std::fmt::Formatter;

use byteorder::{ByteOrder, NetworkEndian};

use crate::*;

#[derive(Clone, Named)]
pub struct Ethernet {
    pub dst: [u8; 6],
    pub src: [u8; 6],
    pub eth_type: u16,
    /// 802.1Q tag control information, if the frame was tagged.
    pub vlan: Option<u16>,
    pub ip: Option<IPv4>,
}

impl std::fmt::Debug for Ethernet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let src = self.src.map(|b| format!("{:02X}", b)).join(":");
        let dst = self.dst.map(|b| format!("{:02X}", b)).join(":");
        write!(f, "Ethernet(Mac({}->{}) Type({:#06x}))", src, dst, self.eth_type)
    }
}

impl Ethernet {
    pub const IP4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const IEEE_802_1Q: u16 = 0x8100;
    pub const IP6: u16 = 0x86DD;

    /// Dissects an Ethernet II header, or `None` if `data` is shorter than one.
    pub fn new(data: &[u8]) -> Option<Ethernet> {
        let dst: [u8; 6] = get_array!(data, 0..6)?;
        let src: [u8; 6] = get_array!(data, 6..12)?;
        let mut eth_type = NetworkEndian::read_u16(data.get(12..14)?);
        let mut header_len = 14;
        let mut vlan = None;
        if eth_type == Self::IEEE_802_1Q {
            vlan = Some(NetworkEndian::read_u16(data.get(14..16)?) & 0x0FFF);
            eth_type = NetworkEndian::read_u16(data.get(16..18)?);
            header_len = 18;
        }
        let ip = match eth_type {
            Self::IP4 => IPv4::new(&data[header_len..]),
            _ => None,
        };
        Some(Ethernet { dst, src, eth_type, vlan, ip })
    }
}
