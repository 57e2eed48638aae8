use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};

use pcap2vec::packet2vec::generate_x_tokens;
use pcap2vec::TestPcap;

/// Tokenizes one capture with the dictionary of an earlier pipeline run.
#[derive(Parser, Debug)]
#[command(name = "test_pcap", version, about)]
struct Cli {
    pcap: PathBuf,

    /// dict/dictionary.bin of a pipeline output directory
    #[arg(long)]
    dictionary: PathBuf,

    /// N-gram lengths used to build the dictionary, comma separated
    #[arg(short, long, value_delimiter = ',', default_value = "2")]
    ngrams: Vec<u32>,

    /// Print every packet's ids, zero-padded to the longest packet
    #[arg(short, long)]
    print: bool,

    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn ::std::error::Error>> {
    let cli = Cli::parse();
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339());
    tracing_subscriber::fmt()
        .event_format(format)
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let test = TestPcap::restore(&cli.dictionary, &cli.ngrams)?;
    let tokens = test.feature_tokens(&cli.pcap)?;
    let total: usize = tokens.iter().map(Vec::len).sum();
    let unknown = tokens.iter().flatten().filter(|&&id| id == pcap2vec::UNK).count();
    info!(packets = tokens.len(), tokens = total, unknown, "tokenized {}", cli.pcap.display());

    if cli.print {
        for row in generate_x_tokens(&tokens) {
            let line: Vec<String> = row.iter().map(u64::to_string).collect();
            println!("{}", line.join(" "));
        }
    }
    Ok(())
}
