//! Length-prefixed bincode wire protocol for peer RPCs.
//!
//! Frame format: [4-byte length (u32 big-endian)][bincode payload]
//! Every read takes an explicit ceiling; the declared length is checked
//! before any payload bytes are allocated.

use crate::constants::rpc::MAX_FRAME_SIZE;
use crate::error::CommunicationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Serialize `value` and write it as a single length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), CommunicationError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let payload = bincode::serialize(value)?;

    let len = payload.len() as u32;
    if len > MAX_FRAME_SIZE {
        return Err(CommunicationError::FrameTooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;

    Ok(())
}

/// Read one frame of at most `max_len` payload bytes and deserialize it.
pub async fn read_frame<R, T>(reader: &mut R, max_len: u32) -> Result<T, CommunicationError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf);
    if len > max_len {
        return Err(CommunicationError::FrameTooLarge { len, max: max_len });
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;

    Ok(bincode::deserialize(&payload)?)
}

pub async fn write_string<W: AsyncWrite + Unpin>(
    writer: &mut W,
    value: &str,
) -> Result<(), CommunicationError> {
    write_frame(writer, value).await
}

pub async fn read_string<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_len: u32,
) -> Result<String, CommunicationError> {
    read_frame(reader, max_len).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::rpc::MAX_IP_RESPONSE_LEN;

    #[tokio::test]
    async fn test_string_roundtrip() {
        let mut buf = Vec::new();
        write_string(&mut buf, "198.51.100.7").await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let result = read_string(&mut cursor, MAX_IP_RESPONSE_LEN).await.unwrap();
        assert_eq!(result, "198.51.100.7");
    }

    #[tokio::test]
    async fn test_eof_is_io_error() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let result = read_string(&mut cursor, MAX_IP_RESPONSE_LEN).await;
        assert!(matches!(result, Err(CommunicationError::Io(_))));
    }

    #[tokio::test]
    async fn test_oversized_ip_payload_rejected() {
        // A string that fits the general frame limit but not the IP ceiling
        let mut buf = Vec::new();
        write_string(&mut buf, &"1".repeat(200)).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let result = read_string(&mut cursor, MAX_IP_RESPONSE_LEN).await;
        assert!(matches!(
            result,
            Err(CommunicationError::FrameTooLarge { max: MAX_IP_RESPONSE_LEN, .. })
        ));
    }

    #[tokio::test]
    async fn test_declared_length_checked_before_payload() {
        // Only the prefix is present: rejection must not wait for the body
        let len = (MAX_FRAME_SIZE + 1).to_be_bytes();
        let mut cursor = std::io::Cursor::new(len.to_vec());
        let result = read_string(&mut cursor, MAX_FRAME_SIZE).await;
        assert!(matches!(result, Err(CommunicationError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_garbage_payload_is_codec_error() {
        let mut buf = 3u32.to_be_bytes().to_vec();
        buf.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        let mut cursor = std::io::Cursor::new(buf);
        let result = read_string(&mut cursor, MAX_IP_RESPONSE_LEN).await;
        assert!(matches!(result, Err(CommunicationError::Codec(_))));
    }
}
