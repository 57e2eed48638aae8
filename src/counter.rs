use std::collections::HashSet;

use derivative::Derivative;
use pcap_parser::Linktype;

use crate::*;

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct IPCount {
    pub df: usize,
    pub mf: usize,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct TCPCount {
    pub ack: usize,
    pub psh: usize,
    pub rst: usize,
    pub syn: usize,
    pub fin: usize,
}

fn _count_fmt<T>(
    set: &HashSet<T>,
    fmt: &mut std::fmt::Formatter,
) -> Result<(), std::fmt::Error>
{
    write!(fmt, "{}", set.len())
}

/// Traffic statistics of one capture.
#[derive(Default, Derivative, Clone)]
#[derivative(Debug)]
pub struct Count {
    pub total: usize,
    pub ethernet: usize,
    pub ip: usize,
    pub ip_flags: IPCount,
    pub icmp: usize,
    pub tcp: usize,
    pub tcp_flags: TCPCount,
    pub udp: usize,

    #[derivative(Debug(format_with = "_count_fmt"))]
    pub addresses: HashSet<[u8; 4]>,
    #[derivative(Debug(format_with = "_count_fmt"))]
    pub ports: HashSet<u16>,

    pub bytes: usize,
    pub data_bytes: usize,

    pub avg_size: f32,
    pub avg_deltas_size: f32,
    pub avg_time: f32,
    pub avg_deltas_time: f32,
}

impl Count {
    pub fn apply(&mut self, frame: &Frame) {
        self.total += 1;
        if frame.ethernet.is_some() {
            self.ethernet += 1;
        }
        if let Some(ip) = frame.ipv4() {
            self.ip += 1;
            if ip.flags.df { self.ip_flags.df += 1 }
            if ip.flags.mf { self.ip_flags.mf += 1 }
            if ip.protocol == IPv4::ICMP { self.icmp += 1 }
            self.addresses.insert(ip.src);
            self.addresses.insert(ip.dst);
        }
        if let Some(tcp) = frame.tcp() {
            self.tcp += 1;
            if tcp.flags.ack { self.tcp_flags.ack += 1 }
            if tcp.flags.psh { self.tcp_flags.psh += 1 }
            if tcp.flags.rst { self.tcp_flags.rst += 1 }
            if tcp.flags.syn { self.tcp_flags.syn += 1 }
            if tcp.flags.fin { self.tcp_flags.fin += 1 }
            self.ports.insert(tcp.src);
            self.ports.insert(tcp.dst);
            self.data_bytes += tcp.payload.len();
        }
        if let Some(udp) = frame.udp() {
            self.udp += 1;
            self.ports.insert(udp.src);
            self.ports.insert(udp.dst);
            self.data_bytes += udp.payload.len();
        }
    }

    /// Dissects every packet with the capture's link type and tallies it.
    pub fn compute(pcap: &PcapFile) -> Count {
        let link_type = Linktype(pcap.network() as i32);
        let mut count = Count::default();
        let mut sizes = Vec::with_capacity(pcap.num_packets());
        let mut intervals = Vec::new();
        let mut last = None;
        for packet in pcap.packets() {
            let frame = Frame::from_packet(packet, link_type);
            if let Some(last) = last {
                intervals.push(frame.ts - last);
            }
            last = Some(frame.ts);
            sizes.push(packet.data.len());
            count.apply(&frame);
        }
        count.finish(&sizes, &intervals);
        count
    }

    fn finish(&mut self, sizes: &[usize], intervals: &[f64]) {
        let pkt_count = sizes.len().max(1) as f32;
        self.bytes = sizes.iter().sum();
        self.avg_size = self.bytes as f32 / pkt_count;
        self.avg_deltas_size = sizes.iter()
            .map(|&s| (self.avg_size - s as f32).abs())
            .sum::<f32>() / pkt_count;

        self.avg_time = intervals.iter().sum::<f64>() as f32
            / intervals.len().max(1) as f32;
        self.avg_deltas_time = intervals.iter()
            .map(|&t| (self.avg_time - t as f32).abs())
            .sum::<f32>() / intervals.len().max(1) as f32;
    }
}
