//! Native-messaging frame codec: a 4-byte little-endian length prefix
//! followed by a UTF-8 JSON document.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use signet_core::{Error, Result};

/// Upper bound on a single frame. Hosts fragment anything larger through
/// the `partial`/`part` protocol, so a bigger frame is a protocol violation.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Write one framed message.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> Result<()> {
    let payload = serde_json::to_vec(message)?;
    if payload.len() > MAX_FRAME_BYTES {
        return Err(Error::Protocol(format!(
            "outgoing frame of {} bytes exceeds limit",
            payload.len()
        )));
    }
    #[allow(clippy::cast_possible_truncation)]
    let len = payload.len() as u32;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message. Returns `Ok(None)` on clean end-of-stream
/// (EOF at a frame boundary); EOF inside a frame is an error.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Value>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(Error::Protocol(format!(
            "incoming frame of {len} bytes exceeds limit"
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(serde_json::from_slice(&payload)?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let message = json!({"channel_id": "tab-1", "data": {"requestid": 7, "type": "sign"}});

        write_frame(&mut client, &message).await.unwrap();
        drop(client);

        let decoded = read_frame(&mut server).await.unwrap().unwrap();
        assert_eq!(decoded, message);
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn several_frames_in_sequence() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        for i in 0..3 {
            write_frame(&mut client, &json!({"n": i})).await.unwrap();
        }
        drop(client);

        for i in 0..3 {
            let decoded = read_frame(&mut server).await.unwrap().unwrap();
            assert_eq!(decoded["n"], i);
        }
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn truncated_frame_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        // Announce 100 bytes but deliver only 3.
        client.write_all(&100u32.to_le_bytes()).await.unwrap();
        client.write_all(b"abc").await.unwrap();
        drop(client);

        assert!(read_frame(&mut server).await.is_err());
    }

    #[tokio::test]
    async fn oversize_length_prefix_rejected() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        #[allow(clippy::cast_possible_truncation)]
        let len = (MAX_FRAME_BYTES as u32) + 1;
        client.write_all(&len.to_le_bytes()).await.unwrap();
        drop(client);

        assert!(matches!(
            read_frame(&mut server).await.unwrap_err(),
            Error::Protocol(_)
        ));
    }

    #[tokio::test]
    async fn non_json_payload_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let payload = b"not json";
        client
            .write_all(&(payload.len() as u32).to_le_bytes())
            .await
            .unwrap();
        client.write_all(payload).await.unwrap();
        drop(client);

        assert!(matches!(
            read_frame(&mut server).await.unwrap_err(),
            Error::Json(_)
        ));
    }
}
