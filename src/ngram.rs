use std::fmt;

use derive_more::{Deref, From};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::packet::Packet;

/// Payload offset of the first n-gram window.
pub const FIRST_OFFSET: usize = 38;

/// Tokens up to this many bytes are stored inline.
pub const INLINE_LEN: usize = 8;

/// `n` raw payload bytes, ordered bytewise.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, Deref, From)]
pub struct Ngram(SmallVec<[u8; INLINE_LEN]>);

impl From<&[u8]> for Ngram {
    fn from(bytes: &[u8]) -> Self {
        Ngram(SmallVec::from_slice(bytes))
    }
}

impl AsRef<[u8]> for Ngram {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Ngram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ngram({})", self)
    }
}

impl fmt::Display for Ngram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Emits every length-`n` window of a packet's payload starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NgramOperator {
    n: usize,
    offset: usize,
}

impl NgramOperator {
    pub fn new(n: usize) -> Self {
        Self::with_offset(n, FIRST_OFFSET)
    }

    pub fn with_offset(n: usize, offset: usize) -> Self {
        NgramOperator { n, offset }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn apply(&self, packet: &Packet, out: &mut Vec<Ngram>) {
        self.extract(&packet.data, out)
    }

    /// Windows start at `offset ..= payload.len() - n`; a payload shorter than
    /// `offset + n` yields nothing.
    pub fn extract(&self, payload: &[u8], out: &mut Vec<Ngram>) {
        if self.n == 0 || payload.len() < self.offset + self.n {
            return;
        }
        out.extend(payload[self.offset..].windows(self.n).map(Ngram::from));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grams(op: NgramOperator, payload: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        op.extract(payload, &mut out);
        out.into_iter().map(|g| g.to_vec()).collect()
    }

    #[test]
    fn windows_from_offset_zero() {
        let got = grams(NgramOperator::with_offset(3, 0), b"ABCDE");
        assert_eq!(got, vec![b"ABC".to_vec(), b"BCD".to_vec(), b"CDE".to_vec()]);
    }

    #[test]
    fn default_offset_skips_headers() {
        let mut payload = vec![0u8; FIRST_OFFSET];
        payload.extend_from_slice(b"wxyz");
        let got = grams(NgramOperator::new(2), &payload);
        assert_eq!(got, vec![b"wx".to_vec(), b"xy".to_vec(), b"yz".to_vec()]);
    }

    #[test]
    fn short_payloads_emit_nothing() {
        let op = NgramOperator::new(3);
        assert!(grams(op, &[1u8; FIRST_OFFSET + 2]).is_empty());
        assert_eq!(grams(op, &[1u8; FIRST_OFFSET + 3]).len(), 1);
        assert!(grams(NgramOperator::with_offset(0, 0), b"abc").is_empty());
    }

    #[test]
    fn ngrams_order_bytewise_and_print_hex() {
        let a = Ngram::from(&b"\x01\xff"[..]);
        let b = Ngram::from(&b"\x02\x00"[..]);
        assert!(a < b);
        assert_eq!(a.to_string(), "01ff");
        assert_eq!(format!("{:?}", b), "Ngram(0200)");
    }

    #[test]
    fn short_ngrams_stay_inline() {
        let mut out = Vec::new();
        NgramOperator::with_offset(4, 0).extract(b"abcdef", &mut out);
        assert!(out.iter().all(|g| !g.spilled()));
        let long = Ngram::from(&[7u8; INLINE_LEN + 1][..]);
        assert!(long.spilled());
        assert_eq!(long.len(), INLINE_LEN + 1);
    }

    #[test]
    fn archives_like_a_byte_vector() {
        let gram = Ngram::from(&b"xyz"[..]);
        let encoded = bincode::serialize(&gram).unwrap();
        assert_eq!(encoded, bincode::serialize(&b"xyz".to_vec()).unwrap());
        assert_eq!(bincode::deserialize::<Ngram>(&encoded).unwrap(), gram);
    }
}
