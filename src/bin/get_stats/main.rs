use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn, Level};

use pcap2vec::*;

/// Prints header fields and traffic statistics of a capture, and checks the
/// parallel reader against a sequential one.
#[derive(Parser, Debug)]
#[command(name = "get_stats", version, about)]
struct Cli {
    pcap: PathBuf,

    #[arg(short, long, default_value_t = 1)]
    threads: usize,

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

    util::set_num_threads(cli.threads);
    let pcap = PcapFile::read(&cli.pcap)?;
    let header = pcap.header();
    info!(
        byte_order = ?pcap.byte_order(),
        version = %format!("{}.{}", header.version_major, header.version_minor),
        thiszone = header.thiszone,
        sigfigs = header.sigfigs,
        snaplen = header.snaplen,
        network = header.network,
        "header"
    );
    info!(packets = pcap.num_packets(), bytes = pcap.num_bytes(), "read");

    let count = Count::compute(&pcap);
    println!("{:#?}", count);

    let sequential = read_sequential(&cli.pcap)?;
    if sequential.as_slice() == pcap.packets() {
        info!(packets = sequential.len(), "sequential reader agrees");
    } else {
        let first = sequential.iter().zip(pcap.packets()).position(|(a, b)| a != b);
        warn!(
            sequential = sequential.len(),
            parallel = pcap.num_packets(),
            first_difference = ?first,
            "readers disagree"
        );
        return Err("parallel and sequential readers disagree".into());
    }
    Ok(())
}
