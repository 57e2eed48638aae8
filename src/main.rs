use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};

use pcap2vec::{PipelineConfig, ReadPcap};

/// Turns a directory of pcap files into n-gram token ids.
#[derive(Parser, Debug)]
#[command(name = "pcap2vec", version, about)]
struct Cli {
    /// RON pipeline config; other flags are ignored when given
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of input captures
    #[arg(short, long, required_unless_present = "config")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, required_unless_present = "config")]
    output: Option<PathBuf>,

    /// N-gram lengths, comma separated
    #[arg(short, long, value_delimiter = ',', default_value = "2")]
    ngrams: Vec<u32>,

    /// Vocabulary size, including the unknown token
    #[arg(short, long, default_value_t = 10_000)]
    vocab_size: u64,

    #[arg(short, long)]
    threads: Option<usize>,

    /// Only read files whose name matches this regex
    #[arg(long)]
    include: Option<String>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log and skip byte ranges whose records cannot be delimited
    #[arg(long)]
    skip_bad_ranges: bool,

    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn into_config(self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        if let Some(path) = &self.config {
            return Ok(PipelineConfig::from_ron_file(path)?);
        }
        let (Some(input), Some(output)) = (self.input, self.output) else {
            return Err("--input and --output are required without --config".into());
        };
        let mut config = PipelineConfig::new(input, self.ngrams, self.vocab_size, output);
        config.threads = self.threads;
        config.include = self.include;
        config.seed = self.seed;
        config.skip_bad_ranges = self.skip_bad_ranges;
        config.debug = self.debug;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn ::std::error::Error>> {
    let config = Cli::parse().into_config()?;

    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339());
    tracing_subscriber::fmt()
        .event_format(format)
        .with_max_level(if config.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let output = config.output_dir.clone();
    let summary = ReadPcap::run(config)?;
    info!(
        files = summary.files,
        packets = summary.packets,
        tokens = summary.tokens,
        distinct = summary.num_keys,
        output = %output.display(),
        "done"
    );
    Ok(())
}
