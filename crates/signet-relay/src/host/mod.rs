//! Native host connections: one spawned host process per channel, framed
//! JSON transport on its stdio.

mod codec;
mod connector;

pub use codec::{MAX_FRAME_BYTES, read_frame, write_frame};
pub use connector::{HostConnector, HostConnectorConfig, HostEvent};
