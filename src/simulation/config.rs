use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub name: String,
    pub node_count: usize,
    pub window_size: usize,
    pub packet_period_ms: u64,
    pub stats_period_ms: u64,
    pub remote_period_ms: u64,
    pub min_packet_size: u32,
    pub max_packet_size: u32, // exclusive
    pub encryption_probability: f64,
    pub delivery_probability: f64,
    pub remote_reply_probability: f64,
    pub remote_encryption_probability: f64,
    /// Whether a generated packet may be addressed to its own sender.
    pub allow_loopback: bool,
    pub surface_width: f64,
    pub surface_height: f64,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "echo_mesh".to_string(),
            node_count: 8,
            window_size: 20,
            packet_period_ms: 800,
            stats_period_ms: 1000,
            remote_period_ms: 3000,
            min_packet_size: 64,
            max_packet_size: 1088,
            encryption_probability: 0.8,
            delivery_probability: 0.9,
            remote_reply_probability: 0.3,
            remote_encryption_probability: 0.8,
            allow_loopback: true,
            surface_width: 400.0,
            surface_height: 400.0,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: SimConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_count == 0 {
            anyhow::bail!("node_count must be at least 1");
        }
        if !self.allow_loopback && self.node_count < 2 {
            anyhow::bail!("disabling loopback needs at least 2 nodes");
        }
        if self.window_size == 0 {
            anyhow::bail!("window_size must be at least 1");
        }
        if self.min_packet_size >= self.max_packet_size {
            anyhow::bail!(
                "packet size range {}..{} is empty",
                self.min_packet_size,
                self.max_packet_size
            );
        }
        if self.packet_period_ms == 0 || self.stats_period_ms == 0 || self.remote_period_ms == 0 {
            anyhow::bail!("timer periods must be non-zero");
        }
        for (name, p) in [
            ("encryption_probability", self.encryption_probability),
            ("delivery_probability", self.delivery_probability),
            ("remote_reply_probability", self.remote_reply_probability),
            ("remote_encryption_probability", self.remote_encryption_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                anyhow::bail!("{} must be within [0, 1], got {}", name, p);
            }
        }
        Ok(())
    }

    pub fn packet_period(&self) -> Duration {
        Duration::from_millis(self.packet_period_ms)
    }

    pub fn stats_period(&self) -> Duration {
        Duration::from_millis(self.stats_period_ms)
    }

    pub fn remote_period(&self) -> Duration {
        Duration::from_millis(self.remote_period_ms)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_loopback(mut self, allow: bool) -> Self {
        self.allow_loopback = allow;
        self
    }
}
