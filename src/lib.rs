pub mod network;
pub mod metrics;
pub mod render;
pub mod simulation;
pub mod ui;

pub use metrics::StatsAccumulator;
pub use network::{Packet, PacketStatus, Topology};
pub use render::render_frame;
pub use simulation::{Dashboard, Event, Session, SimConfig};

pub mod prelude {
    pub use crate::metrics::{Stats, StatsAccumulator, format_bytes};
    pub use crate::network::{Packet, PacketId, PacketStatus, Point, Topology};
    pub use crate::render::{DrawCommand, Frame, Surface, present, render_frame};
    pub use crate::simulation::{
        Dashboard, DashboardSnapshot, Event, Message, MessageExchange, MessageListener,
        PacketSimulator, Sender, Session, SimConfig,
    };
}
