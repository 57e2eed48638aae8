//! The two-pass pipeline turning a directory of captures into token-id
//! artifacts.
//!
//! Pass 1 parses every file, archives it under `pcaps/`, and counts its
//! n-grams into one [`CountDictionary`]. After the dictionary is finalized
//! and archived under `dict/`, pass 2 parses every file again and writes
//! the flat and per-packet token ids under `intVector/` and
//! `intVectorVector/`.

use std::fs;
use std::path::{Path, PathBuf};

use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::config::{OutputDir, PipelineConfig};
use crate::dictionary::CountDictionary;
use crate::error::{Error, Result};
use crate::ngram::{Ngram, NgramOperator};
use crate::pcap::{ParseOptions, PcapFile};
use crate::util::{self, Stopwatch};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub packets: u64,
    pub tokens: u64,
    pub num_keys: u64,
}

pub struct ReadPcap {
    config: PipelineConfig,
    files: Vec<PathBuf>,
    operators: Vec<NgramOperator>,
    parse_options: ParseOptions,
    dictionary: CountDictionary<Ngram>,
}

/// Regular files of `config.input_dir` matching its include pattern,
/// sorted by path.
pub fn input_files(config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let include = config.include_regex()?;
    let dir = &config.input_dir;
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(re) = &include {
            if !re.is_match(&name.to_string_lossy()) {
                continue;
            }
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl ReadPcap {
    /// Validates the config, applies its worker count, lists the input
    /// files and creates the output layout.
    pub fn new(config: PipelineConfig) -> Result<ReadPcap> {
        config.validate()?;
        if let Some(threads) = config.threads {
            util::set_num_threads(threads);
        }
        let files = input_files(&config)?;
        for dir in OutputDir::iter() {
            let path = config.output_path(dir);
            fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;
        }
        info!(input = %config.input_dir.display(), files = files.len(), threads = util::num_threads(), "pcap2vec pipeline");
        Ok(ReadPcap {
            operators: config.ngram_operators(),
            parse_options: config.parse_options(),
            dictionary: CountDictionary::with_options(config.vocab_size, config.dictionary_options()),
            files,
            config,
        })
    }

    /// Runs both passes.
    pub fn run(config: PipelineConfig) -> Result<RunSummary> {
        let mut pipeline = ReadPcap::new(config)?;
        let mut summary = pipeline.count_pass()?;
        pipeline.finalize()?;
        pipeline.translate_pass()?;
        summary.num_keys = pipeline.dictionary.num_keys();
        Ok(summary)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn dictionary(&self) -> &CountDictionary<Ngram> {
        &self.dictionary
    }

    fn tokens(&self, path: &Path) -> Result<(PcapFile, Vec<Vec<Ngram>>)> {
        let pcap = PcapFile::read_with(path, &self.parse_options)?;
        let sw = Stopwatch::start("ngram extraction");
        let nested = pcap.ngrams(&self.operators);
        sw.stop();
        Ok((pcap, nested))
    }

    /// Pass 1: archive every capture and count its tokens.
    pub fn count_pass(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for path in &self.files {
            let stem = stem(path);
            let (pcap, nested) = self.tokens(path)?;
            pcap.save(&self.config.pcap_archive_path(&stem))?;
            let flat = util::flatten(&nested);
            let sw = Stopwatch::start("process tokens");
            self.dictionary.process_tokens(&flat)?;
            sw.stop();
            info!(file = %path.display(), packets = pcap.num_packets(), tokens = flat.len(), "counted");
            summary.files += 1;
            summary.packets += pcap.num_packets() as u64;
            summary.tokens += flat.len() as u64;
        }
        Ok(summary)
    }

    pub fn finalize(&mut self) -> Result<()> {
        self.dictionary.finalize()?;
        let path = self.config.dictionary_path();
        self.dictionary.save(&path)?;
        debug!(path = %path.display(), "saved dictionary");
        Ok(())
    }

    /// Pass 2: translate every capture with the finalized dictionary.
    pub fn translate_pass(&self) -> Result<()> {
        for path in &self.files {
            let stem = stem(path);
            let (_, nested) = self.tokens(path)?;
            let flat = util::flatten(&nested);
            let sw = Stopwatch::start("translate");
            let ids = self.dictionary.translate(&flat)?;
            let nested_ids = self.dictionary.translate_nested(&nested)?;
            sw.stop();
            util::write_binary(&ids, &self.config.int_vector_path(&stem))?;
            util::save_archive(&nested_ids, &self.config.int_vector_vector_path(&stem))?;
            info!(file = %path.display(), tokens = ids.len(), "translated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_files_are_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pcap", "a.pcap", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("c.pcap")).unwrap();

        let mut config = PipelineConfig::new(dir.path(), vec![2], 10, dir.path().join("out"));
        let all = input_files(&config).unwrap();
        assert_eq!(all.len(), 3);

        config.include = Some(r"\.pcap$".into());
        let names: Vec<String> = input_files(&config).unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pcap", "b.pcap"]);
    }

    #[test]
    fn missing_input_dir_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new(dir.path().join("missing"), vec![2], 10, dir.path().join("out"));
        assert!(matches!(ReadPcap::new(config), Err(Error::Io { .. })));
    }

    #[test]
    fn creates_output_layout() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        let config = PipelineConfig::new(&input, vec![2], 10, dir.path().join("out"));
        let summary = ReadPcap::run(config.clone()).unwrap();
        assert_eq!(summary, RunSummary::default());
        for sub in OutputDir::iter() {
            assert!(config.output_path(sub).is_dir(), "{sub}");
        }
        assert!(config.dictionary_path().is_file());
    }
}
