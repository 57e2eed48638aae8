//! Ground-truth labelers.
//!
//! A [`Labeler`] decides from a packet's identifying 5-tuple and timestamp
//! whether it belongs to malicious traffic, and names the event type.

use std::fmt;
use std::path::Path;

use crate::error::LabelError;
use crate::*;

pub mod darpa2009;
pub mod isot;

pub use darpa2009::{Darpa2009, Darpa2009Item};
pub use isot::{Classification, Isot, IsotItem};

pub trait Labeler: Send + Sync {
    fn is_danger(&self, info: &PacketInfo) -> bool;
    fn packet_event_type(&self, info: &PacketInfo) -> String;
    /// Type name of the labeler, for log lines.
    fn labeler_name(&self) -> &'static str;
}

/// Identifying fields of one packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PacketInfo {
    /// IPv4 protocol number, 0 when the frame is not IPv4.
    pub protocol: u8,
    pub src_ip: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
    pub seconds: u32,
    pub useconds: u32,
}

impl PacketInfo {
    /// Dissects an Ethernet II frame. Frames that are not IPv4 keep
    /// protocol 0, empty addresses and ports 0; so do ports of non TCP/UDP
    /// datagrams.
    pub fn parse(seconds: u32, useconds: u32, frame: &[u8]) -> Result<PacketInfo, LabelError> {
        if useconds > 999_999 {
            return Err(LabelError::Microseconds(useconds));
        }
        let info = match Ethernet::new(frame).and_then(|e| e.ip) {
            Some(ip) => {
                let (src_port, dst_port) = ip.ports().unwrap_or_default();
                PacketInfo {
                    protocol: ip.protocol,
                    src_ip: ip.src_addr().to_string(),
                    src_port,
                    dst_ip: ip.dst_addr().to_string(),
                    dst_port,
                    seconds,
                    useconds,
                }
            }
            None => PacketInfo { seconds, useconds, ..Default::default() },
        };
        Ok(info)
    }

    pub fn from_packet(packet: &Packet) -> Result<PacketInfo, LabelError> {
        Self::parse(packet.ts_sec(), packet.ts_usec(), &packet.data)
    }

    pub fn timestamp_micros(&self) -> i64 {
        self.seconds as i64 * 1_000_000 + self.useconds as i64
    }

    /// Upper-case protocol name as written in label files, empty if unknown.
    pub fn protocol_name(&self) -> &'static str {
        match self.protocol {
            IPv4::ICMP => "ICMP",
            IPv4::TCP => "TCP",
            IPv4::UDP => "UDP",
            _ => "",
        }
    }
}

impl fmt::Display for PacketInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Protocol {} sourceIp {} sourcePort {} destIp {} destPort {} seconds {} useconds {}",
            self.protocol, self.src_ip, self.src_port, self.dst_ip, self.dst_port, self.seconds, self.useconds,
        )
    }
}

pub(crate) fn open_csv(path: &Path, has_headers: bool) -> Result<csv::Reader<std::fs::File>, LabelError> {
    let file = std::fs::File::open(path)
        .map_err(|source| LabelError::Open { path: path.to_path_buf(), source })?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}
