//! Topology rendering.
//!
//! [`render_frame`] turns the packet window and the mesh layout into a flat
//! list of [`DrawCommand`]s. It keeps no state between calls, so the same
//! inputs always produce the same frame. Putting a frame on screen is the job
//! of a [`Surface`].

pub mod surface;

pub use surface::{present, Surface};

use crate::network::{Packet, PacketStatus, Point, Topology};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const EDGE_WIDTH: f64 = 1.0;
const TRANSIT_WIDTH: f64 = 2.0;
const GLOW_RADIUS: f64 = 20.0;
const NODE_RADIUS: f64 = 6.0;
const MARKER_RADIUS: f64 = 4.0;
const LABEL_OFFSET: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Flattens the color onto an opaque background.
    pub fn over(self, bg: Rgba) -> (u8, u8, u8) {
        let a = self.a.clamp(0.0, 1.0);
        let mix = |fg: u8, bg: u8| (fg as f64 * a + bg as f64 * (1.0 - a)).round() as u8;
        (mix(self.r, bg.r), mix(self.g, bg.g), mix(self.b, bg.b))
    }
}

pub mod palette {
    use super::Rgba;

    pub const BACKGROUND: Rgba = Rgba::rgb(0x0a, 0x0a, 0x0a);
    pub const ACCENT: Rgba = Rgba::rgb(0x25, 0x63, 0xeb);
    pub const EDGE: Rgba = Rgba::rgba(37, 99, 235, 0.1);
    pub const GLOW: Rgba = Rgba::rgba(37, 99, 235, 0.3);
    pub const LABEL: Rgba = Rgba::rgba(255, 255, 255, 0.5);
    pub const ENCRYPTED: Rgba = Rgba::rgb(0x8b, 0x5c, 0xf6);
    pub const PLAINTEXT: Rgba = Rgba::rgb(0x06, 0xb6, 0xd4);
    pub const DELIVERED: Rgba = Rgba::rgb(0x10, 0xb9, 0x81);
    pub const FAILED: Rgba = Rgba::rgb(0xef, 0x44, 0x44);
}

pub fn packet_color(encrypted: bool) -> Rgba {
    if encrypted {
        palette::ENCRYPTED
    } else {
        palette::PLAINTEXT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    Clear { color: Rgba },
    Line { from: Point, to: Point, color: Rgba, width: f64 },
    /// Radial gradient from `inner` at the center to fully transparent at `radius`.
    Glow { center: Point, radius: f64, inner: Rgba },
    Circle { center: Point, radius: f64, color: Rgba },
    Label { at: Point, text: String, color: Rgba },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    pub fn transit_lines(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { width, .. } if *width == TRANSIT_WIDTH))
            .count()
    }
}

pub fn render_frame<'a>(
    packets: impl IntoIterator<Item = &'a Packet>,
    topology: &Topology,
    now: Duration,
) -> Frame {
    let n = topology.node_count();
    let mut commands = Vec::with_capacity(1 + n * n.saturating_sub(1) / 2 + n * 3);

    commands.push(DrawCommand::Clear {
        color: palette::BACKGROUND,
    });

    for (i, j) in topology.all_edges() {
        commands.push(DrawCommand::Line {
            from: topology.position(i),
            to: topology.position(j),
            color: palette::EDGE,
            width: EDGE_WIDTH,
        });
    }

    for i in 0..n {
        let center = topology.position(i);
        commands.push(DrawCommand::Glow {
            center,
            radius: GLOW_RADIUS,
            inner: palette::GLOW,
        });
        commands.push(DrawCommand::Circle {
            center,
            radius: NODE_RADIUS,
            color: palette::ACCENT,
        });
        commands.push(DrawCommand::Label {
            at: Point::new(center.x, center.y + LABEL_OFFSET),
            text: format!("{:X}", i),
            color: palette::LABEL,
        });
    }

    for packet in packets {
        if packet.status() != PacketStatus::Transit {
            continue;
        }
        // packets from a wider mesh than the one on screen have nowhere to go
        if packet.sender >= n || packet.receiver >= n {
            continue;
        }

        let from = topology.position(packet.sender);
        let to = topology.position(packet.receiver);
        let color = packet_color(packet.encrypted);

        commands.push(DrawCommand::Line {
            from,
            to,
            color,
            width: TRANSIT_WIDTH,
        });
        commands.push(DrawCommand::Circle {
            center: from.lerp(to, packet.progress(now)),
            radius: MARKER_RADIUS,
            color,
        });
    }

    Frame {
        width: topology.width(),
        height: topology.height(),
        commands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::packet::PAYLOAD_LEN;
    use crate::network::PacketId;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn packet(id: u64, sender: usize, receiver: usize, encrypted: bool, now: u64) -> Packet {
        let mut p = Packet::new(
            PacketId::new(id),
            sender,
            receiver,
            128,
            encrypted,
            ms(0),
            [0; PAYLOAD_LEN],
        );
        p.advance(ms(now), || true);
        p
    }

    fn markers(frame: &Frame) -> Vec<(Point, Rgba)> {
        frame
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Circle { center, radius, color } if *radius == MARKER_RADIUS => {
                    Some((*center, *color))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn static_mesh_layers_in_order() {
        let topo = Topology::new(8, 400.0, 400.0);
        let frame = render_frame(&[] as &[Packet], &topo, ms(0));

        assert_eq!(frame.commands[0], DrawCommand::Clear { color: palette::BACKGROUND });
        // clear + 28 edges + 8 * (glow, node, label)
        assert_eq!(frame.commands.len(), 1 + 28 + 24);
        assert!(matches!(frame.commands[1], DrawCommand::Line { width, .. } if width == EDGE_WIDTH));
        assert!(matches!(frame.commands[29], DrawCommand::Glow { .. }));

        let labels: Vec<&str> = frame
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Label { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["0", "1", "2", "3", "4", "5", "6", "7"]);
        assert_eq!(frame.transit_lines(), 0);
    }

    #[test]
    fn only_transit_packets_are_drawn() {
        let topo = Topology::new(8, 400.0, 400.0);
        let packets = vec![
            packet(0, 0, 4, true, 500),
            packet(1, 1, 5, false, 2000),
            packet(2, 2, 6, true, 3500),
        ];
        let frame = render_frame(&packets, &topo, ms(2000));
        assert_eq!(frame.transit_lines(), 1);

        let found = markers(&frame);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, palette::PLAINTEXT);
    }

    #[test]
    fn marker_interpolates_along_edge() {
        let topo = Topology::new(8, 400.0, 400.0);
        let packets = vec![packet(0, 0, 4, true, 1500)];

        let halfway = markers(&render_frame(&packets, &topo, ms(2000)));
        let mid = topo.position(0).lerp(topo.position(4), 0.5);
        assert!(halfway[0].0.distance(mid) < 1e-9);
        assert_eq!(halfway[0].1, palette::ENCRYPTED);

        let start = markers(&render_frame(&packets, &topo, ms(1000)));
        assert!(start[0].0.distance(topo.position(0)) < 1e-9);

        // status is stale here, progress still clamps
        let late = markers(&render_frame(&packets, &topo, ms(5000)));
        assert!(late[0].0.distance(topo.position(4)) < 1e-9);
    }

    #[test]
    fn rendering_is_repeatable() {
        let topo = Topology::new(8, 400.0, 400.0);
        let packets = vec![packet(0, 3, 3, true, 1200), packet(1, 7, 2, false, 2900)];
        let a = render_frame(&packets, &topo, ms(2400));
        let b = render_frame(&packets, &topo, ms(2400));
        assert_eq!(a, b);
    }

    #[test]
    fn alpha_flattening() {
        assert_eq!(palette::ACCENT.over(palette::BACKGROUND), (0x25, 0x63, 0xeb));
        assert_eq!(Rgba::rgba(255, 255, 255, 0.0).over(palette::BACKGROUND), (10, 10, 10));
        assert_eq!(palette::LABEL.over(Rgba::rgb(0, 0, 0)), (128, 128, 128));
    }
}
