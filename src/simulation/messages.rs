use crate::simulation::config::SimConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const REMOTE_RESPONSES: [&str; 5] = [
    "SIGNAL RECEIVED. PROCESSING.",
    "ACKNOWLEDGED. ENCRYPTION VERIFIED.",
    "DATA INTEGRITY CONFIRMED.",
    "ROUTING THROUGH SECURE TUNNEL.",
    "HANDSHAKE COMPLETE. CHANNEL OPEN.",
];

const HASH_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub content: String,
    pub encrypted: bool,
    pub sender: Sender,
    pub timestamp: Duration,
    pub hash: String,
}

/// Receives every locally sent message. The only outbound hook of the chat.
pub trait MessageListener {
    fn on_message_sent(&mut self, content: &str, encrypted: bool);
}

#[derive(Debug)]
pub struct MessageExchange {
    log: Vec<Message>,
    reply_probability: f64,
    reply_encryption_probability: f64,
    rng: StdRng,
}

impl MessageExchange {
    pub fn new(config: &SimConfig, rng: StdRng) -> Self {
        Self {
            log: Vec::new(),
            reply_probability: config.remote_reply_probability,
            reply_encryption_probability: config.remote_encryption_probability,
            rng,
        }
    }

    /// Appends a local message and tells `listener` about it. Blank input is
    /// ignored and yields `None`.
    pub fn submit(
        &mut self,
        content: &str,
        encrypted: bool,
        now: Duration,
        listener: &mut dyn MessageListener,
    ) -> Option<&Message> {
        let content = content.trim();
        if content.is_empty() {
            debug!("Ignoring blank submission");
            return None;
        }

        self.push(content.to_string(), encrypted, Sender::Local, now);
        listener.on_message_sent(content, encrypted);
        self.log.last()
    }

    /// Remote side only talks once the channel has seen traffic.
    pub fn on_remote_tick(&mut self, now: Duration) -> Option<&Message> {
        if self.log.is_empty() || !self.rng.gen_bool(self.reply_probability) {
            return None;
        }

        let content = REMOTE_RESPONSES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(REMOTE_RESPONSES[0]);
        let encrypted = self.rng.gen_bool(self.reply_encryption_probability);
        self.push(content.to_string(), encrypted, Sender::Remote, now);
        self.log.last()
    }

    fn push(&mut self, content: String, encrypted: bool, sender: Sender, now: Duration) {
        let message = Message {
            id: self.log.len() as u64,
            content,
            encrypted,
            sender,
            timestamp: now,
            hash: self.generate_hash(),
        };
        info!(
            "{:?} message #{} ({} chars, encrypted: {})",
            message.sender,
            message.hash,
            message.content.chars().count(),
            message.encrypted
        );
        self.log.push(message);
    }

    fn generate_hash(&mut self) -> String {
        (0..HASH_LEN)
            .map(|_| format!("{:x}", self.rng.gen_range(0..16u8)))
            .collect()
    }

    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}
