//! Wire protocol for the front-end and native-host transports.
//!
//! Messages are JSON envelopes `{channel_id, data}`. This module classifies
//! raw values into canonical message types with a tolerant reader pattern:
//! unknown `data.type` values are preserved and forwarded verbatim, while
//! structurally invalid envelopes are rejected at the boundary.

mod builders;
mod parser;
mod types;

pub use builders::{get_part_ack, host_send_error, inject_approval_answer, reassembly_error};
pub use parser::{parse_front_line, parse_host_frame, request_id_key};
pub use types::{ApprovalAction, FrontMessage, HostMessage};
