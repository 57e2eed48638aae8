use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Byte order of a pcap file, picked once from its magic number.
///
/// Every multi-byte field of the global header and of each record header
/// is decoded through the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteDecoder {
    /// Magic stored as `a1 b2 c3 d4`.
    Big,
    /// Magic stored as `d4 c3 b2 a1`.
    Little,
}

impl ByteDecoder {
    pub const MAGIC: u32 = 0xa1b2c3d4;
    pub const MAGIC_SWAPPED: u32 = 0xd4c3b2a1;

    /// Picks the decoder from the first four bytes of a file.
    pub fn from_magic(magic: [u8; 4]) -> Option<Self> {
        match magic {
            [0xa1, 0xb2, 0xc3, 0xd4] => Some(Self::Big),
            [0xd4, 0xc3, 0xb2, 0xa1] => Some(Self::Little),
            _ => None,
        }
    }

    pub fn u16(self, data: &[u8]) -> u16 {
        match self {
            Self::Big => BigEndian::read_u16(data),
            Self::Little => LittleEndian::read_u16(data),
        }
    }

    pub fn i32(self, data: &[u8]) -> i32 {
        match self {
            Self::Big => BigEndian::read_i32(data),
            Self::Little => LittleEndian::read_i32(data),
        }
    }

    pub fn u32(self, data: &[u8]) -> u32 {
        match self {
            Self::Big => BigEndian::read_u32(data),
            Self::Little => LittleEndian::read_u32(data),
        }
    }

    /// Decodes the u32 at `offset`, or `None` when fewer than four bytes remain.
    pub fn u32_at(self, data: &[u8], offset: usize) -> Option<u32> {
        let end = offset.checked_add(4)?;
        data.get(offset..end).map(|b| self.u32(b))
    }

    pub fn write_u16(self, buf: &mut [u8], n: u16) {
        match self {
            Self::Big => BigEndian::write_u16(buf, n),
            Self::Little => LittleEndian::write_u16(buf, n),
        }
    }

    pub fn write_i32(self, buf: &mut [u8], n: i32) {
        match self {
            Self::Big => BigEndian::write_i32(buf, n),
            Self::Little => LittleEndian::write_i32(buf, n),
        }
    }

    pub fn write_u32(self, buf: &mut [u8], n: u32) {
        match self {
            Self::Big => BigEndian::write_u32(buf, n),
            Self::Little => LittleEndian::write_u32(buf, n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_selects_order() {
        assert_eq!(ByteDecoder::from_magic([0xa1, 0xb2, 0xc3, 0xd4]), Some(ByteDecoder::Big));
        assert_eq!(ByteDecoder::from_magic([0xd4, 0xc3, 0xb2, 0xa1]), Some(ByteDecoder::Little));
        assert_eq!(ByteDecoder::from_magic([0x0a, 0x0d, 0x0d, 0x0a]), None);
    }

    #[test]
    fn both_orders_decode_their_own_magic() {
        let big = [0xa1, 0xb2, 0xc3, 0xd4];
        let little = [0xd4, 0xc3, 0xb2, 0xa1];
        assert_eq!(ByteDecoder::Big.u32(&big), ByteDecoder::MAGIC);
        assert_eq!(ByteDecoder::Little.u32(&little), ByteDecoder::MAGIC);
    }

    #[test]
    fn signed_and_short_fields() {
        assert_eq!(ByteDecoder::Big.i32(&[0xff, 0xff, 0xff, 0xfe]), -2);
        assert_eq!(ByteDecoder::Little.i32(&[0xfe, 0xff, 0xff, 0xff]), -2);
        assert_eq!(ByteDecoder::Big.u16(&[0x00, 0x02]), 2);
        assert_eq!(ByteDecoder::Little.u16(&[0x02, 0x00]), 2);
    }

    #[test]
    fn checked_read_stops_at_the_end() {
        let data = [1, 0, 0, 0, 2, 0];
        assert_eq!(ByteDecoder::Little.u32_at(&data, 0), Some(1));
        assert_eq!(ByteDecoder::Little.u32_at(&data, 3), None);
        assert_eq!(ByteDecoder::Little.u32_at(&data, usize::MAX), None);
    }
}
