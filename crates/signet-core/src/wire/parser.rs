//! Parsers for both transport directions.
//!
//! Tolerant reader pattern: unknown `data.type` values become
//! [`HostMessage::Passthrough`] / [`FrontMessage::Request`]; structurally
//! invalid envelopes are rejected with [`Error::Protocol`].

use serde_json::Value;

use super::types::{ApprovalAction, FrontMessage, HostMessage};
use crate::error::{Error, Result};

const ADD_APPROVED_PREFIX: &str = "add_approved_site: ";
const IS_APPROVED_PREFIX: &str = "is_approved_site: ";
const SET_LOG_LEVEL_PREFIX: &str = "set_log_level=";

/// Parse one NDJSON line from a front-end connection.
///
/// Accepts the structured form `{"data": {"type": "set_log_level", ...}}`
/// as well as the legacy bare-string form `"set_log_level=debug"` for the
/// log level control message.
pub fn parse_front_line(line: &str) -> Result<FrontMessage> {
    let raw: Value = serde_json::from_str(line)?;

    if let Value::String(s) = &raw {
        if let Some(level) = s.strip_prefix(SET_LOG_LEVEL_PREFIX) {
            return Ok(FrontMessage::SetLogLevel(level.parse()?));
        }
        return Err(Error::Protocol(format!(
            "unexpected string message on front-end transport: {s}"
        )));
    }

    let Some(data) = raw.get("data") else {
        return Err(Error::Protocol("envelope missing 'data'".to_string()));
    };
    if !data.is_object() {
        return Err(Error::Protocol("'data' is not an object".to_string()));
    }

    if data.get("type").and_then(Value::as_str) == Some("set_log_level") {
        let value = data
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Protocol("set_log_level missing 'value'".to_string()))?;
        let level = value.strip_prefix(SET_LOG_LEVEL_PREFIX).unwrap_or(value);
        return Ok(FrontMessage::SetLogLevel(level.parse()?));
    }

    let channel_id = required_channel_id(&raw)?;
    Ok(FrontMessage::Request { channel_id, raw })
}

/// Classify one decoded frame from the native host.
pub fn parse_host_frame(raw: Value) -> Result<HostMessage> {
    let channel_id = required_channel_id(&raw)?;
    let Some(data) = raw.get("data") else {
        return Err(Error::Protocol("host message missing 'data'".to_string()));
    };
    if !data.is_object() {
        return Err(Error::Protocol("'data' is not an object".to_string()));
    }

    // 1. Fragment markers. Only 1, >1 and -1 are fragment actions; any other
    // value falls through to normal classification.
    let partial = data.get("partial").and_then(Value::as_i64).unwrap_or(0);
    if partial >= 1 || partial == -1 {
        let request_id = data.get("requestid").cloned().unwrap_or(Value::Null);
        let body = data
            .get("part")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(HostMessage::Fragment {
            channel_id,
            request_id,
            partial,
            body,
        });
    }

    // 2. Fatal error notifications.
    if let Some(error) = data.get("error").filter(|v| !v.is_null()) {
        let error = error
            .as_str()
            .map_or_else(|| error.to_string(), ToString::to_string);
        return Ok(HostMessage::Fatal { channel_id, error });
    }

    // 3. Approval queries.
    if data.get("type").and_then(Value::as_str) == Some("approved_site") {
        let value = data
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Protocol("approved_site query missing 'value'".to_string()))?;
        let (action, origin) = if let Some(origin) = value.strip_prefix(ADD_APPROVED_PREFIX) {
            (ApprovalAction::Add, origin)
        } else if let Some(origin) = value.strip_prefix(IS_APPROVED_PREFIX) {
            (ApprovalAction::Query, origin)
        } else {
            return Err(Error::Protocol(format!(
                "malformed approved_site value: {value}"
            )));
        };
        let origin = origin.to_string();
        return Ok(HostMessage::ApprovalQuery {
            channel_id,
            action,
            origin,
            raw,
        });
    }

    // 4. Everything else is forwarded verbatim.
    Ok(HostMessage::Passthrough { channel_id, raw })
}

/// Render a `requestid` value as a map key. Request ids are opaque; the
/// host may send them as strings or numbers.
pub fn request_id_key(request_id: &Value) -> String {
    match request_id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn required_channel_id(raw: &Value) -> Result<String> {
    raw.get("channel_id")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| Error::Protocol("message missing 'channel_id'".to_string()))
}
