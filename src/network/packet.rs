use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const PAYLOAD_LEN: usize = 32;

/// Packets younger than this are still waiting at the sender.
pub const TRANSIT_AFTER: Duration = Duration::from_millis(1000);
/// Age at which a packet's fate gets decided.
pub const RESOLVE_AFTER: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketId(u64);

impl PacketId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkt-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketStatus {
    Pending,
    Transit,
    Delivered,
    Failed,
}

impl PacketStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }

    // Delivered and Failed share the last stage, neither can follow the other
    fn stage(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Transit => 1,
            Self::Delivered | Self::Failed => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Transit => "TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    pub id: PacketId,
    pub sender: usize,
    pub receiver: usize,
    pub size_bytes: u32,
    pub encrypted: bool,
    /// Session time at which the packet was generated.
    pub created_at: Duration,
    status: PacketStatus,
    pub payload: [u8; PAYLOAD_LEN],
}

impl Packet {
    pub fn new(
        id: PacketId,
        sender: usize,
        receiver: usize,
        size_bytes: u32,
        encrypted: bool,
        created_at: Duration,
        payload: [u8; PAYLOAD_LEN],
    ) -> Self {
        Self {
            id,
            sender,
            receiver,
            size_bytes,
            encrypted,
            created_at,
            status: PacketStatus::Pending,
            payload,
        }
    }

    pub fn status(&self) -> PacketStatus {
        self.status
    }

    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.created_at)
    }

    pub fn is_loopback(&self) -> bool {
        self.sender == self.receiver
    }

    /// Moves the packet forward in its lifecycle for the given session time.
    ///
    /// `resolve` is only consulted the first time the packet becomes old enough
    /// to finish, and whatever it answers sticks for the rest of the packet's life.
    /// Returns true when the status changed.
    pub fn advance(&mut self, now: Duration, resolve: impl FnOnce() -> bool) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        let age = self.age(now);
        let next = if age >= RESOLVE_AFTER {
            if resolve() {
                PacketStatus::Delivered
            } else {
                PacketStatus::Failed
            }
        } else if age >= TRANSIT_AFTER {
            PacketStatus::Transit
        } else {
            PacketStatus::Pending
        };

        // never walk backwards, e.g. when handed a stale clock
        if next.stage() > self.status.stage() {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Fraction of the sender→receiver edge covered at `now`, clamped to [0, 1].
    pub fn progress(&self, now: Duration) -> f64 {
        let age_ms = self.age(now).as_secs_f64() * 1000.0;
        let transit_ms = TRANSIT_AFTER.as_secs_f64() * 1000.0;
        let window_ms = (RESOLVE_AFTER - TRANSIT_AFTER).as_secs_f64() * 1000.0;
        ((age_ms - transit_ms) / window_ms).clamp(0.0, 1.0)
    }

    pub fn payload_hex(&self) -> String {
        self.payload
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn node_label(index: usize) -> String {
    format!("NODE_{:X}", index)
}
