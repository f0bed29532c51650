use std::io::BufWriter;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use refgraph::cli::{Cli, Format};
use refgraph::oracle;
use refgraph::profile::Counters;
use refgraph::render::{DotNodeWriter, DotPackageWriter, JsonWriter, Writer};
use refgraph::search::Searcher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the rendered graph.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level())),
        )
        .init();

    let config = cli.search_config()?;
    let counters = Arc::new(Counters::default());

    let load_start = Instant::now();
    let ws = Arc::new(oracle::load(&cli.dirs, &counters)?);
    let load_time = load_start.elapsed();

    let stream_start = Instant::now();
    let edges = Searcher::new(ws.clone(), config, counters.clone()).search()?;

    let stdout = std::io::stdout();
    let out = BufWriter::new(stdout.lock());
    let opts = cli.render_options();
    let mut writer: Box<dyn Writer> = match (cli.format, cli.stat) {
        (Format::Dot, true) => Box::new(DotPackageWriter::new(out, opts)),
        (Format::Dot, false) => Box::new(DotNodeWriter::new(out, ws.clone(), opts)),
        (Format::Json, _) => Box::new(JsonWriter::new(out, ws.clone(), cli.stat)),
    };

    for edge in edges {
        writer.write(&edge)?;
    }
    writer.flush()?;
    let stream_time = stream_start.elapsed();

    if cli.profile {
        counters.report(load_time, stream_time);
    }

    Ok(())
}
