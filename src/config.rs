use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};

use crate::dictionary::DictionaryOptions;
use crate::error::{ConfigError, Error, Result};
use crate::ngram::NgramOperator;
use crate::pcap::ParseOptions;

/// Sub-directories of a pipeline output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr, Display)]
pub enum OutputDir {
    #[strum(serialize = "pcaps")]
    Pcaps,
    #[strum(serialize = "intVector")]
    IntVector,
    #[strum(serialize = "intVectorVector")]
    IntVectorVector,
    #[strum(serialize = "dict")]
    Dict,
}

fn default_prefix_int_vector() -> String {
    "intVector".to_string()
}

fn default_prefix_int_vector_vector() -> String {
    "intVectorVector".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    /// N-gram lengths, applied in this order.
    pub ngrams: Vec<u32>,
    pub vocab_size: u64,
    pub output_dir: PathBuf,
    #[serde(default = "default_prefix_int_vector")]
    pub prefix_int_vector: String,
    #[serde(default = "default_prefix_int_vector_vector")]
    pub prefix_int_vector_vector: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default)]
    pub skip_bad_ranges: bool,
    /// Only input files whose name matches are read.
    #[serde(default)]
    pub include: Option<String>,
}

impl PipelineConfig {
    pub fn new(input_dir: impl Into<PathBuf>, ngrams: Vec<u32>, vocab_size: u64, output_dir: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            input_dir: input_dir.into(),
            ngrams,
            vocab_size,
            output_dir: output_dir.into(),
            prefix_int_vector: default_prefix_int_vector(),
            prefix_int_vector_vector: default_prefix_int_vector_vector(),
            debug: false,
            threads: None,
            seed: 0,
            capacity: None,
            skip_bad_ranges: false,
            include: None,
        }
    }

    /// Reads and validates a RON config file.
    pub fn from_ron_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: PipelineConfig = ron::from_str(&text)
            .map_err(|source| ConfigError::Ron { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ngrams.is_empty() {
            return Err(ConfigError::Invalid("at least one n-gram length is required".into()));
        }
        if self.ngrams.contains(&0) {
            return Err(ConfigError::Invalid("n-gram lengths must be at least 1".into()));
        }
        if self.vocab_size == 0 {
            return Err(ConfigError::Invalid("vocab_size must be at least 1".into()));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.capacity == Some(0) {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        self.include_regex()?;
        Ok(())
    }

    pub fn include_regex(&self) -> Result<Option<Regex>, ConfigError> {
        Ok(self.include.as_deref().map(Regex::new).transpose()?)
    }

    pub fn ngram_operators(&self) -> Vec<NgramOperator> {
        self.ngrams.iter().map(|&n| NgramOperator::new(n as usize)).collect()
    }

    pub fn dictionary_options(&self) -> DictionaryOptions {
        DictionaryOptions { seed: self.seed, capacity: self.capacity }
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions { skip_bad_ranges: self.skip_bad_ranges }
    }

    pub fn output_path(&self, dir: OutputDir) -> PathBuf {
        self.output_dir.join(dir.as_ref())
    }

    pub fn int_vector_path(&self, stem: &str) -> PathBuf {
        self.output_path(OutputDir::IntVector)
            .join(format!("{}_{}.bin", self.prefix_int_vector, stem))
    }

    pub fn int_vector_vector_path(&self, stem: &str) -> PathBuf {
        self.output_path(OutputDir::IntVectorVector)
            .join(format!("{}_{}.bin", self.prefix_int_vector_vector, stem))
    }

    pub fn pcap_archive_path(&self, stem: &str) -> PathBuf {
        self.output_path(OutputDir::Pcaps).join(format!("{}.bin", stem))
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.output_path(OutputDir::Dict).join("dictionary.bin")
    }
}
