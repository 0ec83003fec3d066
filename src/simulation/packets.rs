use crate::network::packet::PAYLOAD_LEN;
use crate::network::{Packet, PacketId};
use crate::simulation::config::SimConfig;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Owns the sliding window of recent packets and is the only thing that
/// changes them.
#[derive(Debug)]
pub struct PacketSimulator {
    window: VecDeque<Packet>,
    next_id: u64,
    node_count: usize,
    window_size: usize,
    size_range: (u32, u32),
    encryption_probability: f64,
    delivery_probability: f64,
    allow_loopback: bool,
    rng: StdRng,
}

impl PacketSimulator {
    pub fn new(config: &SimConfig, rng: StdRng) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window_size + 1),
            next_id: 0,
            node_count: config.node_count,
            window_size: config.window_size,
            size_range: (config.min_packet_size, config.max_packet_size),
            encryption_probability: config.encryption_probability,
            delivery_probability: config.delivery_probability,
            allow_loopback: config.allow_loopback,
            rng,
        }
    }

    /// One generation tick: a fresh packet joins the window, the oldest one
    /// leaves once the window is full, then every status catches up with `now`.
    pub fn on_generation_tick(&mut self, now: Duration) -> &Packet {
        let packet = self.generate(now);
        debug!(
            "Generated {} {} -> {} ({}B, encrypted: {})",
            packet.id, packet.sender, packet.receiver, packet.size_bytes, packet.encrypted
        );
        self.window.push_back(packet);

        while self.window.len() > self.window_size {
            self.window.pop_front();
        }

        self.recompute_statuses(now);
        &self.window[self.window.len() - 1]
    }

    pub fn recompute_statuses(&mut self, now: Duration) {
        let delivery_probability = self.delivery_probability;
        for packet in self.window.iter_mut() {
            let rng = &mut self.rng;
            if packet.advance(now, || rng.gen_bool(delivery_probability)) {
                debug!("{} is now {}", packet.id, packet.status().label());
            }
        }
    }

    fn generate(&mut self, now: Duration) -> Packet {
        let id = PacketId::new(self.next_id);
        self.next_id += 1;

        let sender = self.rng.gen_range(0..self.node_count);
        let receiver = if self.allow_loopback {
            self.rng.gen_range(0..self.node_count)
        } else {
            // pick among the other nodes, then skip over the sender
            let r = self.rng.gen_range(0..self.node_count - 1);
            if r >= sender { r + 1 } else { r }
        };

        let mut payload = [0u8; PAYLOAD_LEN];
        self.rng.fill(&mut payload[..]);

        Packet::new(
            id,
            sender,
            receiver,
            self.rng.gen_range(self.size_range.0..self.size_range.1),
            self.rng.gen_bool(self.encryption_probability),
            now,
            payload,
        )
    }

    pub fn packets(&self) -> impl Iterator<Item = &Packet> {
        self.window.iter()
    }

    pub fn snapshot(&self) -> Vec<Packet> {
        self.window.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn generated(&self) -> u64 {
        self.next_id
    }
}
