use std::path::Path;

use tracing::info;

use crate::dictionary::CountDictionary;
use crate::error::{DictionaryError, Result};
use crate::label::Labeler;
use crate::ngram::{Ngram, NgramOperator};
use crate::packet2vec::generate_y;
use crate::pcap::{ParseOptions, PcapFile};

/// Tokenizes unseen captures with a dictionary saved by a pipeline run.
pub struct TestPcap {
    dictionary: CountDictionary<Ngram>,
    operators: Vec<NgramOperator>,
    parse_options: ParseOptions,
}

impl TestPcap {
    /// Loads a finalized dictionary; `ngrams` must match the run that built it.
    pub fn restore(dictionary_path: &Path, ngrams: &[u32]) -> Result<TestPcap> {
        let dictionary: CountDictionary<Ngram> = CountDictionary::load(dictionary_path)?;
        if !dictionary.is_finalized() {
            return Err(DictionaryError::NotFinalized.into());
        }
        info!(path = %dictionary_path.display(), num_keys = dictionary.num_keys(), vocab_size = dictionary.vocab_size(), "restored dictionary");
        Ok(TestPcap {
            dictionary,
            operators: ngrams.iter().map(|&n| NgramOperator::new(n as usize)).collect(),
            parse_options: ParseOptions::default(),
        })
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    pub fn dictionary(&self) -> &CountDictionary<Ngram> {
        &self.dictionary
    }

    /// Token ids of every packet of the capture at `path`.
    pub fn feature_tokens(&self, path: &Path) -> Result<Vec<Vec<u64>>> {
        let pcap = PcapFile::read_with(path, &self.parse_options)?;
        let nested = pcap.ngrams(&self.operators);
        Ok(self.dictionary.translate_nested(&nested)?)
    }

    pub fn label_vector(&self, path: &Path, labeler: &dyn Labeler) -> Result<Vec<u8>> {
        let pcap = PcapFile::read_with(path, &self.parse_options)?;
        Ok(generate_y(&pcap, labeler)?)
    }
}
