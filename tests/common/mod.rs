#![allow(dead_code)]

use std::fs;
use std::path::Path;

use pcap2vec::{ByteDecoder, GlobalHeader, PacketHeader};

pub const T0: u32 = 1_600_000_000;

/// Payload of `len` bytes below 0x28, so no offset inside it looks like a
/// record timestamp.
pub fn payload(seed: usize, len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 7 + seed * 3) % 40) as u8).collect()
}

pub fn pcap_bytes(decoder: ByteDecoder, snaplen: u32, payloads: &[Vec<u8>]) -> Vec<u8> {
    let header = GlobalHeader { snaplen, ..GlobalHeader::default() };
    let mut bytes = header.encode(decoder).to_vec();
    for (i, data) in payloads.iter().enumerate() {
        let record = PacketHeader {
            ts_sec: T0 + i as u32,
            ts_usec: 0,
            incl_len: data.len() as u32,
            orig_len: data.len() as u32,
        };
        bytes.extend_from_slice(&record.encode(decoder));
        bytes.extend_from_slice(data);
    }
    bytes
}

/// `count` payloads between 40 and 119 bytes long.
pub fn payloads(seed: usize, count: usize) -> Vec<Vec<u8>> {
    (0..count).map(|i| payload(seed + i, 40 + (i * 13 + seed) % 80)).collect()
}

/// Writes three little-endian captures and a non-capture file into `dir`.
pub fn write_captures(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    for (i, name) in ["day1.pcap", "day2.pcap", "day3.pcap"].iter().enumerate() {
        fs::write(dir.join(name), pcap_bytes(ByteDecoder::Little, 65535, &payloads(i * 5, 20 + i * 10))).unwrap();
    }
    fs::write(dir.join("README.txt"), b"not a capture").unwrap();
}

/// Every file under `dir`, as (relative path, contents), sorted by path.
pub fn tree(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(next) = stack.pop() {
        for entry in fs::read_dir(&next).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let name = path.strip_prefix(dir).unwrap().to_string_lossy().into_owned();
                files.push((name, fs::read(&path).unwrap()));
            }
        }
    }
    files.sort();
    files
}
