//! Turns directories of libpcap captures into n-gram token ids for
//! sequence models, with ground-truth labels for supervised training.

#[macro_export]
macro_rules! get_array {
    ($source:expr, $slice:expr) => {
        $source.get($slice).and_then(|s| s.try_into().ok())
    }
}

pub mod bytes;
pub mod config;
pub mod counter;
pub mod dictionary;
pub mod error;
pub mod frame;
pub mod iter;
pub mod label;
pub mod ngram;
pub mod packet;
pub mod packet2vec;
pub mod pcap;
pub mod read_pcap;
pub mod test_pcap;
pub mod time;
pub mod util;

pub use bytes::ByteDecoder;
pub use config::{OutputDir, PipelineConfig};
pub use counter::Count;
pub use dictionary::{CountDictionary, DictionaryOptions, KeyHasher, StringHash, UNK};
pub use error::{ArchiveError, ConfigError, DictionaryError, Error, LabelError, PcapError, PcapFormatError, Result};
pub use frame::ethernet::Ethernet;
pub use frame::ip::{IPFlags, IPv4, Transport};
pub use frame::tcp::{TCPFlags, TCP};
pub use frame::udp::UDP;
pub use frame::Frame;
pub use iter::{read_sequential, SequentialPcap};
pub use label::{Classification, Darpa2009, Darpa2009Item, Isot, IsotItem, Labeler, PacketInfo};
pub use ngram::{Ngram, NgramOperator};
pub use packet::{Packet, PacketHeader};
pub use packet2vec::LabelSummary;
pub use pcap::{GlobalHeader, ParseOptions, PcapFile};
pub use read_pcap::{ReadPcap, RunSummary};
pub use test_pcap::TestPcap;

pub use pcap2vec_derive::*;

/// Types that know their own name, for log lines.
pub trait Named {
    fn name() -> &'static str where Self: Sized;
}
