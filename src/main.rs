//  ,---.      ,--.                                      ,--.
// |  .-' ,---.|  ,---.  ,---.     ,--,--,--. ,---.  ,---.|  ,---.
// |  `-,| .--'|  .-.  || .-. |    |        || .-. :(  .-'|  .-.  |
// |  .-'\ `--.|  | |  |' '-' '    |  |  |  |\   --..-'  `)  | |  |
// `---'  `---'`--' `--' `---'     `--`--`--' `----'`----'`--' `--'

// A terminal rendition of a mesh dashboard. Nothing in here touches a real network,
// every packet, message and statistic is made up on the spot.

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use echomesh::metrics::export::write_history;
use echomesh::network::packet::node_label;
use echomesh::prelude::*;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with simulation settings, flags below override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Never address a packet to its own sender
    #[arg(long, global = true)]
    no_loopback: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal dashboard
    Run {
        #[arg(long, default_value = "echomesh.log")]
        log_file: PathBuf,
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Same session without a UI, for a fixed number of seconds
    Headless {
        #[arg(short, long, default_value_t = 30)]
        duration: u64,
        /// Sent once at start, repeatable
        #[arg(short, long)]
        message: Vec<String>,
        #[arg(long)]
        plaintext: bool,
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Print the node layout for a surface size
    Topology {
        #[arg(long, default_value_t = 400.0)]
        width: f64,
        #[arg(long, default_value_t = 400.0)]
        height: f64,
    },
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    match log_file {
        // the alternate screen belongs to the dashboard
        Some(path) => {
            let file = std::fs::File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Arc::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if cli.no_loopback {
        config = config.with_loopback(false);
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let program_start = Instant::now();
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Run { log_file, .. } => Some(log_file.as_path()),
        _ => None,
    };
    init_tracing(cli.verbose, log_file)?;
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Run { export, .. } => {
            info!("echomesh: dashboard");
            let session = Session::start(config);
            let dashboard = echomesh::ui::run(session).await?;
            if let Some(dir) = export {
                export_stats(&dashboard, dir)?;
            }
        }

        Commands::Headless {
            duration,
            message,
            plaintext,
            export,
        } => {
            let dashboard = run_headless(config, *duration, message, !*plaintext).await?;
            if let Some(dir) = export {
                export_stats(&dashboard, dir)?;
            }
        }

        Commands::Topology { width, height } => {
            let topology = Topology::new(config.node_count, *width, *height);
            let c = topology.center();
            println!(
                "\n{} nodes, center ({:.1}, {:.1}), radius {:.1}, {} edges\n",
                topology.node_count(),
                c.x,
                c.y,
                topology.radius(),
                topology.all_edges().len()
            );
            for (i, p) in topology.positions().iter().enumerate() {
                println!("  {:<8} ({:>7.2}, {:>7.2})", node_label(i), p.x, p.y);
            }
            println!();
        }
    }

    info!("Total runtime: {:.2}s", program_start.elapsed().as_secs_f64());
    Ok(())
}

async fn run_headless(
    config: SimConfig,
    duration: u64,
    messages: &[String],
    encrypted: bool,
) -> Result<Dashboard> {
    info!("echomesh: headless run for {}s", duration);

    let session = Session::start(config);
    for content in messages {
        session.submit(content.clone(), encrypted);
    }

    let pb = ProgressBar::new(duration);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.magenta/blue} {pos}/{len}s {msg}")?
            .progress_chars("█▓░"),
    );

    let mut tick = tokio::time::interval_at(
        tokio::time::Instant::now() + Duration::from_secs(1),
        Duration::from_secs(1),
    );
    for _ in 0..duration {
        tick.tick().await;
        pb.inc(1);

        let snap = session.latest();
        let in_transit = snap
            .packets
            .iter()
            .filter(|p| p.status() == PacketStatus::Transit)
            .count();
        debug!(
            "t={}s packets={} bytes={} rate={:.1}% latency={:.0}ms transit={}",
            snap.at.as_secs(),
            snap.stats.packets_transmitted,
            snap.stats.bytes_transferred,
            snap.stats.encryption_rate,
            snap.stats.latency_ms,
            in_transit
        );
        pb.set_message(format!(
            "Packets: {} | {} | In transit: {} | Latency: {:.0}ms",
            snap.stats.packets_transmitted,
            format_bytes(snap.stats.bytes_transferred),
            in_transit,
            snap.stats.latency_ms
        ));
    }
    pb.finish_with_message("Session complete");

    let dashboard = session.shutdown().await?;
    summarize(&dashboard);
    Ok(dashboard)
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    name: String,
    packets_generated: u64,
    delivered: usize,
    failed: usize,
    messages: usize,
    stats: Stats,
}

fn summary(dashboard: &Dashboard) -> SessionSummary {
    let count = |status: PacketStatus| {
        dashboard
            .packets()
            .packets()
            .filter(|p| p.status() == status)
            .count()
    };
    SessionSummary {
        name: dashboard.config().name.clone(),
        packets_generated: dashboard.packets().generated(),
        delivered: count(PacketStatus::Delivered),
        failed: count(PacketStatus::Failed),
        messages: dashboard.messages().len(),
        stats: dashboard.stats(),
    }
}

fn summarize(dashboard: &Dashboard) {
    let s = summary(dashboard);
    info!("Packets generated: {}", s.packets_generated);
    info!("Window: {} delivered, {} failed", s.delivered, s.failed);
    info!("Messages exchanged: {}", s.messages);
    info!(
        "Stats: {} packets, {}, {:.1}% encrypted, {:.0}ms",
        s.stats.packets_transmitted,
        format_bytes(s.stats.bytes_transferred),
        s.stats.encryption_rate,
        s.stats.latency_ms
    );
}

fn export_stats(dashboard: &Dashboard, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

    let csv_path = dir.join(format!("stats_{}.csv", timestamp));
    let rows = write_history(&csv_path, dashboard.stats_history())?;
    info!("Stats saved to: {} ({} rows)", csv_path.display(), rows);

    let json_path = dir.join(format!("summary_{}.json", timestamp));
    std::fs::write(&json_path, serde_json::to_string_pretty(&summary(dashboard))?)?;
    info!("Summary saved to: {}", json_path.display());

    Ok(())
}
