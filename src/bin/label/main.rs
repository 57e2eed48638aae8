use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{info, Level};

use pcap2vec::packet2vec::label_directory;
use pcap2vec::time::local_utc_diff;
use pcap2vec::{Darpa2009, Isot, Labeler};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LabelerKind {
    Darpa2009,
    Isot,
}

/// Writes per-packet labels for the captures archived by a pipeline run.
#[derive(Parser, Debug)]
#[command(name = "label", version, about)]
struct Cli {
    /// Pipeline output directory
    output: PathBuf,

    #[arg(short, long, value_enum)]
    labeler: LabelerKind,

    /// Ground-truth CSV
    #[arg(short, long)]
    truth: PathBuf,

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

    let labeler: Box<dyn Labeler> = match cli.labeler {
        LabelerKind::Darpa2009 => Box::new(Darpa2009::from_path(&cli.truth)?),
        LabelerKind::Isot => Box::new(Isot::from_path(&cli.truth)?),
    };
    info!(labeler = labeler.labeler_name(), local_utc_diff = local_utc_diff(), "labeling {}", cli.output.display());

    let summary = label_directory(&cli.output, labeler.as_ref())?;
    for (event, packets) in &summary.events {
        info!(event = %event, packets, "event type");
    }
    info!(files = summary.files, packets = summary.packets, dangerous = summary.dangerous, "done");
    Ok(())
}
