//! Constructors for relay-originated wire messages.

use serde_json::{Value, json};

/// Synthetic error delivered to a front-end port when a send to the native
/// host fails.
pub fn host_send_error(channel_id: &str, request_id: &Value) -> Value {
    json!({
        "channel_id": channel_id,
        "type": "error",
        "data": {
            "requestid": request_id,
            "message": "Error sending message to Native Host"
        }
    })
}

/// Synthetic error delivered to a front-end port when a reassembled payload
/// fails to parse after the terminal fragment.
pub fn reassembly_error(channel_id: &str, request_id: &Value) -> Value {
    json!({
        "channel_id": channel_id,
        "type": "error",
        "data": {
            "requestid": request_id,
            "message": "Failed to parse reassembled message from Native Host"
        }
    })
}

/// Flow-control acknowledgment for transport variant B: asks the host for
/// the fragment following `last_part`.
pub fn get_part_ack(channel_id: &str, request_id: &Value, last_part: i64) -> Value {
    json!({
        "channel_id": channel_id,
        "data": {
            "requestid": request_id,
            "type": "get_part",
            "last_part": last_part
        }
    })
}

/// Write the answer to an approval query into the message's parameter list
/// so it can be echoed back to the host.
pub fn inject_approval_answer(message: &mut Value, approved: bool) {
    if let Some(data) = message.get_mut("data").and_then(Value::as_object_mut) {
        data.insert(
            "params".to_string(),
            json!([{"type": "boolean", "value": approved}]),
        );
    }
}
