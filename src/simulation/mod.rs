pub mod config;
pub mod messages;
pub mod packets;
pub mod session;

pub use config::SimConfig;
pub use messages::{Message, MessageExchange, MessageListener, Sender};
pub use packets::PacketSimulator;
pub use session::Session;

use crate::metrics::{Stats, StatsAccumulator, StatsSnapshot};
use crate::network::{Packet, Topology};
use crate::render::{render_frame, Frame};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Everything that can change the dashboard. Timers, the input handler and
/// the resize hook all speak this.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PacketTick,
    StatsTick,
    RemoteTick,
    Submit { content: String, encrypted: bool },
    Resize { width: f64, height: f64 },
}

/// Read-only view handed to the display layer after every change.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub at: Duration,
    pub packets: Vec<Packet>,
    pub messages: Arc<[Message]>,
    pub stats: Stats,
    pub packets_generated: u64,
    pub topology: Topology,
    pub frame: Frame,
}

/// One dashboard session's worth of state. Owns all three simulators and the
/// last rendered frame; mutated only through [`Dashboard::handle`].
#[derive(Debug)]
pub struct Dashboard {
    config: SimConfig,
    packets: PacketSimulator,
    messages: MessageExchange,
    // shared with snapshots, rebuilt only when the log grows
    message_view: Arc<[Message]>,
    stats: StatsAccumulator,
    topology: Topology,
    frame: Frame,
}

impl Dashboard {
    pub fn new(config: SimConfig) -> Self {
        let (packet_rng, message_rng, stats_rng) = match config.seed {
            Some(seed) => {
                info!("Seeding session with {}", seed);
                (
                    StdRng::seed_from_u64(seed),
                    StdRng::seed_from_u64(seed.wrapping_add(1)),
                    StdRng::seed_from_u64(seed.wrapping_add(2)),
                )
            }
            None => (
                StdRng::from_entropy(),
                StdRng::from_entropy(),
                StdRng::from_entropy(),
            ),
        };

        let topology = Topology::new(config.node_count, config.surface_width, config.surface_height);
        let packets = PacketSimulator::new(&config, packet_rng);
        let frame = render_frame(packets.packets(), &topology, Duration::ZERO);

        Self {
            messages: MessageExchange::new(&config, message_rng),
            message_view: Arc::from(Vec::new()),
            stats: StatsAccumulator::new(stats_rng),
            packets,
            topology,
            frame,
            config,
        }
    }

    /// Applies one event at session time `now`. Returns true when something
    /// observable changed.
    pub fn handle(&mut self, event: Event, now: Duration) -> bool {
        let changed = match event {
            Event::PacketTick => {
                self.packets.on_generation_tick(now);
                true
            }
            Event::StatsTick => {
                self.stats.on_ambient_tick(now);
                true
            }
            Event::RemoteTick => {
                let replied = self.messages.on_remote_tick(now).is_some();
                if replied {
                    self.refresh_messages();
                }
                replied
            }
            Event::Submit { content, encrypted } => {
                let sent = self
                    .messages
                    .submit(&content, encrypted, now, &mut self.stats)
                    .is_some();
                if sent {
                    self.refresh_messages();
                }
                sent
            }
            Event::Resize { width, height } => {
                debug!("Resizing surface to {}x{}", width, height);
                self.topology = self.topology.resized(width, height);
                true
            }
        };
        if changed {
            self.render(now);
        }
        changed
    }

    fn refresh_messages(&mut self) {
        self.message_view = Arc::from(self.messages.messages());
    }

    fn render(&mut self, now: Duration) {
        self.frame = render_frame(self.packets.packets(), &self.topology, now);
    }

    pub fn snapshot(&self, now: Duration) -> DashboardSnapshot {
        DashboardSnapshot {
            at: now,
            packets: self.packets.snapshot(),
            messages: Arc::clone(&self.message_view),
            stats: self.stats.stats(),
            packets_generated: self.packets.generated(),
            topology: self.topology,
            frame: self.frame.clone(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn packets(&self) -> &PacketSimulator {
        &self.packets
    }

    pub fn messages(&self) -> &MessageExchange {
        &self.messages
    }

    pub fn stats(&self) -> Stats {
        self.stats.stats()
    }

    pub fn stats_history(&self) -> &[StatsSnapshot] {
        self.stats.history()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PacketStatus;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(SimConfig::default().with_seed(11))
    }

    #[test]
    fn packet_tick_rerenders() {
        let mut d = dashboard();
        assert!(d.handle(Event::PacketTick, ms(800)));
        assert!(d.handle(Event::PacketTick, ms(1600)));
        assert!(d.handle(Event::PacketTick, ms(2400)));
        assert_eq!(d.packets().len(), 3);

        // first packet is 1600ms old at the last tick
        let first = d.packets().packets().next().unwrap();
        assert_eq!(first.status(), PacketStatus::Transit);
        assert_eq!(d.frame().transit_lines(), 1);
    }

    #[test]
    fn submit_reaches_stats() {
        let mut d = dashboard();
        let submit = Event::Submit {
            content: "hello".into(),
            encrypted: true,
        };
        assert!(d.handle(submit, ms(10)));
        assert_eq!(d.messages().len(), 1);
        assert_eq!(d.stats().packets_transmitted, 1);
        assert_eq!(d.stats().bytes_transferred, 10);
    }

    #[test]
    fn blank_submit_changes_nothing() {
        let mut d = dashboard();
        let submit = Event::Submit {
            content: "   ".into(),
            encrypted: false,
        };
        assert!(!d.handle(submit, ms(10)));
        assert!(d.messages().is_empty());
        assert_eq!(d.stats(), Stats::default());
    }

    #[test]
    fn resize_moves_the_ring() {
        let mut d = dashboard();
        let before = d.frame().clone();
        assert!(d.handle(Event::Resize { width: 200.0, height: 200.0 }, ms(0)));
        assert_eq!(d.topology().radius(), 70.0);
        assert_ne!(&before, d.frame());
        assert_eq!(d.frame().width, 200.0);
    }

    #[test]
    fn seeded_sessions_repeat() {
        let run = || {
            let mut d = dashboard();
            for i in 1..=12u64 {
                d.handle(Event::PacketTick, ms(i * 800));
                d.handle(Event::StatsTick, ms(i * 1000));
            }
            d.snapshot(ms(12_000))
        };
        let a = run();
        let b = run();
        assert_eq!(a.stats, b.stats);
        let ids = |s: &DashboardSnapshot| {
            s.packets
                .iter()
                .map(|p| (p.sender, p.receiver, p.size_bytes, p.status()))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.frame, b.frame);
    }

    #[test]
    fn snapshots_share_the_message_log() {
        let mut d = dashboard();
        d.handle(
            Event::Submit {
                content: "ping".into(),
                encrypted: false,
            },
            ms(10),
        );
        let before = d.snapshot(ms(10));
        d.handle(Event::PacketTick, ms(800));
        d.handle(Event::StatsTick, ms(1000));
        let after = d.snapshot(ms(1000));
        assert!(Arc::ptr_eq(&before.messages, &after.messages));

        d.handle(
            Event::Submit {
                content: "pong".into(),
                encrypted: true,
            },
            ms(1100),
        );
        let latest = d.snapshot(ms(1100));
        assert!(!Arc::ptr_eq(&after.messages, &latest.messages));
        assert_eq!(latest.messages.len(), 2);
        assert_eq!(latest.messages[1].content, "pong");
    }
}
