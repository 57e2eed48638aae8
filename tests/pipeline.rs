use std::fs;
use std::path::Path;

use pcap2vec::util::{load_archive, read_binary};
use pcap2vec::*;

mod common;

use common::*;

fn config(input: &Path, output: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::new(input, vec![2, 3], 50, output);
    config.include = Some(r"\.pcap$".into());
    config
}

#[test]
fn artifacts_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    write_captures(&input);

    let first = ReadPcap::run(config(&input, &dir.path().join("out1"))).unwrap();
    let second = ReadPcap::run(config(&input, &dir.path().join("out2"))).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.files, 3);
    assert_eq!(first.packets, 20 + 30 + 40);

    let a = tree(&dir.path().join("out1"));
    let b = tree(&dir.path().join("out2"));
    assert_eq!(a.len(), 3 * 3 + 1);
    assert_eq!(a, b);
}

#[test]
fn per_packet_ids_concatenate_to_flat_ids() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    write_captures(&input);
    let config = config(&input, &dir.path().join("out"));
    let summary = ReadPcap::run(config.clone()).unwrap();

    let mut tokens = 0;
    for stem in ["day1", "day2", "day3"] {
        let flat = read_binary(&config.int_vector_path(stem)).unwrap();
        let nested: Vec<Vec<u64>> = load_archive(&config.int_vector_vector_path(stem)).unwrap();
        assert_eq!(nested.concat(), flat);
        assert!(flat.iter().all(|&id| id < config.vocab_size));
        tokens += flat.len() as u64;
    }
    assert_eq!(tokens, summary.tokens);

    let dictionary: CountDictionary<Ngram> = CountDictionary::load(&config.dictionary_path()).unwrap();
    assert!(dictionary.is_finalized());
    assert_eq!(dictionary.total_count(), summary.tokens);
    assert_eq!(dictionary.num_keys(), summary.num_keys);
}

#[test]
fn archived_captures_match_their_sources() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    write_captures(&input);
    let config = config(&input, &dir.path().join("out"));
    ReadPcap::run(config.clone()).unwrap();

    for stem in ["day1", "day2", "day3"] {
        let archived = PcapFile::load(&config.pcap_archive_path(stem)).unwrap();
        let parsed = PcapFile::read(&input.join(format!("{}.pcap", stem))).unwrap();
        assert_eq!(archived, parsed);
    }
}

#[test]
fn restored_dictionary_reproduces_pipeline_ids() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    write_captures(&input);
    let config = config(&input, &dir.path().join("out"));
    ReadPcap::run(config.clone()).unwrap();

    let test = TestPcap::restore(&config.dictionary_path(), &config.ngrams).unwrap();
    let tokens = test.feature_tokens(&input.join("day2.pcap")).unwrap();
    let expected: Vec<Vec<u64>> = load_archive(&config.int_vector_vector_path("day2")).unwrap();
    assert_eq!(tokens, expected);

    // Unseen bytes translate to the unknown id.
    let unseen = dir.path().join("unseen.pcap");
    fs::write(&unseen, pcap_bytes(ByteDecoder::Big, 65535, &[vec![0x30; 60]])).unwrap();
    let tokens = test.feature_tokens(&unseen).unwrap();
    assert_eq!(tokens.len(), 1);
    assert!(tokens[0].iter().all(|&id| id == UNK));
}

#[test]
fn unfinalized_dictionary_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dictionary.bin");
    let dictionary: CountDictionary<Ngram> = CountDictionary::new(10);
    dictionary.process_tokens(&[Ngram::from(&b"ab"[..])]).unwrap();
    dictionary.save(&path).unwrap();
    assert!(matches!(
        TestPcap::restore(&path, &[2]),
        Err(Error::Dictionary(DictionaryError::NotFinalized))
    ));
}

#[test]
fn byte_orders_read_alike() {
    let dir = tempfile::tempdir().unwrap();
    let packets = payloads(3, 25);
    let little = dir.path().join("little.pcap");
    let big = dir.path().join("big.pcap");
    fs::write(&little, pcap_bytes(ByteDecoder::Little, 65535, &packets)).unwrap();
    fs::write(&big, pcap_bytes(ByteDecoder::Big, 65535, &packets)).unwrap();

    let little = PcapFile::read(&little).unwrap();
    let big = PcapFile::read(&big).unwrap();
    assert_eq!(little.byte_order(), ByteDecoder::Little);
    assert_eq!(big.byte_order(), ByteDecoder::Big);
    assert_eq!(little.packets(), big.packets());
    assert_eq!(little.num_packets(), 25);
}

#[test]
fn truncated_capture_drops_the_partial_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = pcap_bytes(ByteDecoder::Little, 65535, &payloads(1, 8));
    bytes.truncate(bytes.len() - 10);
    let path = dir.path().join("cut.pcap");
    fs::write(&path, &bytes).unwrap();

    let pcap = PcapFile::read(&path).unwrap();
    assert_eq!(pcap.num_packets(), 7);
}

#[test]
fn labels_follow_the_ground_truth() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    write_captures(&input);
    let config = config(&input, &dir.path().join("out"));
    ReadPcap::run(config.clone()).unwrap();

    // Synthetic payloads are not IPv4, so nothing matches.
    let truth = dir.path().join("truth.csv");
    fs::write(&truth, "attack,c2s,10.0.0.1,1,10.0.0.2,2,11/3/2009 10:00,11/3/2009 11:00\n").unwrap();
    let labeler = Darpa2009::from_path(&truth).unwrap();
    let summary = packet2vec::label_directory(&config.output_dir, &labeler).unwrap();
    assert_eq!(summary.files, 3);
    assert_eq!(summary.dangerous, 0);
    assert_eq!(summary.events.get("Benign"), Some(&90));
    let labels = fs::read(config.output_dir.join("labels/day1.bin")).unwrap();
    assert_eq!(labels, vec![0; 20]);
}
