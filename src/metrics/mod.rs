pub mod export;

use crate::simulation::messages::MessageListener;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const INITIAL_ENCRYPTION_RATE: f64 = 100.0;
const INITIAL_LATENCY_MS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub packets_transmitted: u64,
    pub bytes_transferred: u64,
    pub encryption_rate: f64,
    pub latency_ms: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            packets_transmitted: 0,
            bytes_transferred: 0,
            encryption_rate: INITIAL_ENCRYPTION_RATE,
            latency_ms: INITIAL_LATENCY_MS,
        }
    }
}

/// A row of the stats history, one per ambient tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub timestamp: f64,
    pub packets_transmitted: u64,
    pub bytes_transferred: u64,
    pub encryption_rate: f64,
    pub latency_ms: f64,
    pub messages_sent: u64,
}

#[derive(Debug)]
pub struct StatsAccumulator {
    stats: Stats,
    messages_sent: u64,
    history: Vec<StatsSnapshot>,
    rng: StdRng,
}

impl StatsAccumulator {
    pub fn new(rng: StdRng) -> Self {
        Self {
            stats: Stats::default(),
            messages_sent: 0,
            history: Vec::new(),
            rng,
        }
    }

    /// Background traffic: both counters grow by a random amount and the two
    /// gauges get re-rolled from scratch.
    pub fn on_ambient_tick(&mut self, now: Duration) {
        self.stats.packets_transmitted += self.rng.gen_range(0..10u64);
        self.stats.bytes_transferred += self.rng.gen_range(0..2048u64);
        self.stats.encryption_rate = self.rng.gen_range(95.0..=100.0);
        self.stats.latency_ms = self.rng.gen_range(8.0..=28.0);

        let snapshot = self.snapshot(now);
        debug!(
            "Stats: {} packets, {}, {:.1}% encrypted, {:.0}ms",
            snapshot.packets_transmitted,
            format_bytes(snapshot.bytes_transferred),
            snapshot.encryption_rate,
            snapshot.latency_ms
        );
        self.history.push(snapshot);
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    pub fn snapshot(&self, now: Duration) -> StatsSnapshot {
        StatsSnapshot {
            timestamp: now.as_secs_f64(),
            packets_transmitted: self.stats.packets_transmitted,
            bytes_transferred: self.stats.bytes_transferred,
            encryption_rate: self.stats.encryption_rate,
            latency_ms: self.stats.latency_ms,
            messages_sent: self.messages_sent,
        }
    }

    pub fn history(&self) -> &[StatsSnapshot] {
        &self.history
    }
}

impl MessageListener for StatsAccumulator {
    fn on_message_sent(&mut self, content: &str, encrypted: bool) {
        let multiplier = if encrypted { 2 } else { 1 };
        self.stats.packets_transmitted += 1;
        self.stats.bytes_transferred += content.chars().count() as u64 * multiplier;
        self.messages_sent += 1;
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    }
}
