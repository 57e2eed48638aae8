use pcap_parser::Linktype;

use crate::*;

pub mod ethernet;
pub mod ip;
pub mod tcp;
pub mod udp;

/// Link, network and transport layers of one captured packet, as far as
/// they could be dissected.
#[derive(Debug, Clone, Named)]
pub struct Frame {
    pub ts: f64,
    pub caplen: u32,
    pub origlen: u32,
    pub ethernet: Option<Ethernet>,
    ip: Option<IPv4>,
}

impl Frame {
    pub fn new(data: &[u8], ts: f64, caplen: u32, origlen: u32, link_type: Linktype) -> Frame {
        let (ethernet, ip) = match link_type {
            Linktype::ETHERNET => {
                let ethernet = Ethernet::new(data);
                let ip = ethernet.as_ref().and_then(|e| e.ip.clone());
                (ethernet, ip)
            }
            Linktype::RAW | Linktype::IPV4 => (None, IPv4::new(data)),
            _ => (None, None),
        };
        Frame { ts, caplen, origlen, ethernet, ip }
    }

    pub fn from_packet(packet: &Packet, link_type: Linktype) -> Frame {
        Self::new(&packet.data, packet.ts(), packet.incl_len(), packet.orig_len(), link_type)
    }

    pub fn ipv4(&self) -> Option<&IPv4> {
        self.ip.as_ref()
    }

    pub fn tcp(&self) -> Option<&TCP> {
        match self.ip.as_ref()?.transport {
            Transport::Tcp(ref tcp) => Some(tcp),
            _ => None,
        }
    }

    pub fn udp(&self) -> Option<&UDP> {
        match self.ip.as_ref()?.transport {
            Transport::Udp(ref udp) => Some(udp),
            _ => None,
        }
    }

    /// Name of the innermost dissected layer.
    pub fn top_layer(&self) -> &'static str {
        match (&self.ethernet, &self.ip) {
            (_, Some(ip)) => match ip.transport {
                Transport::Tcp(_) => TCP::name(),
                Transport::Udp(_) => UDP::name(),
                Transport::Other => IPv4::name(),
            },
            (Some(_), None) => Ethernet::name(),
            (None, None) => Frame::name(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    /// Ethernet II + IPv4 (no options) + TCP or UDP header, then `payload`.
    pub fn ipv4_frame(protocol: u8, src: [u8; 4], sport: u16, dst: [u8; 4], dport: u16, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x02, 0, 0, 0, 0, 0x01, 0x02, 0, 0, 0, 0, 0x02, 0x08, 0x00];
        let transport_len = if protocol == 6 { 20 } else { 8 };
        let total = (20 + transport_len + payload.len()) as u16;
        frame.extend_from_slice(&[0x45, 0, (total >> 8) as u8, total as u8, 0, 1, 0x40, 0, 64, protocol, 0, 0]);
        frame.extend_from_slice(&src);
        frame.extend_from_slice(&dst);
        frame.extend_from_slice(&sport.to_be_bytes());
        frame.extend_from_slice(&dport.to_be_bytes());
        if protocol == 6 {
            frame.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0, 0x50, 0x02, 0xff, 0xff, 0, 0, 0, 0]);
        } else {
            let len = (8 + payload.len()) as u16;
            frame.extend_from_slice(&len.to_be_bytes());
            frame.extend_from_slice(&[0, 0]);
        }
        frame.extend_from_slice(payload);
        frame
    }
}
