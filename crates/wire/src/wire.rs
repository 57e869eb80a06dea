// SPDX-License-Identifier: MIT

//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::request::Request;
use crate::response::Response;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message of {0} bytes exceeds the {1}-byte limit")]
    TooLarge(u32, u32),
}

/// 16 MiB; generous enough for a job status payload, small enough to stop a
/// corrupt or malicious length prefix from causing an unbounded allocation.
const MAX_MESSAGE_BYTES: u32 = 16 * 1024 * 1024;

/// Serializes `value` to JSON. Does not add the length prefix — see
/// [`write_message`] for that.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserializes a JSON payload (no length prefix) back into `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Writes `payload` prefixed with its 4-byte big-endian length.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    let len = u32::try_from(payload.len()).map_err(|_| ProtocolError::TooLarge(u32::MAX, MAX_MESSAGE_BYTES))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads a 4-byte big-endian length prefix followed by that many bytes.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::TooLarge(len, MAX_MESSAGE_BYTES));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Reads a framed [`Request`] from `reader`.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request, ProtocolError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

/// Encodes and writes a framed [`Response`] to `writer`.
pub async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<(), ProtocolError> {
    let bytes = encode(response)?;
    write_message(writer, &bytes).await
}

/// Encodes and writes a framed [`Request`] to `writer` (CLI side).
pub async fn write_request<W: AsyncWrite + Unpin>(writer: &mut W, request: &Request) -> Result<(), ProtocolError> {
    let bytes = encode(request)?;
    write_message(writer, &bytes).await
}

/// Reads a framed [`Response`] from `reader` (CLI side).
pub async fn read_response<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Response, ProtocolError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
