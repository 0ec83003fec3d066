pub mod packet;
pub mod topology;

pub use packet::{Packet, PacketId, PacketStatus};
pub use topology::{Point, Topology};
