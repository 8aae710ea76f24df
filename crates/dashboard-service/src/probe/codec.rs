//! Wire codec for the Minecraft Server List Ping protocol.
//!
//! Every packet is framed as `VarInt length | VarInt packet id | body`.
//! VarInts are little-endian groups of 7 bits with a continuation bit and
//! are at most 5 bytes long. Strings are a VarInt byte length followed by
//! UTF-8 bytes.
//!
//! Both directions are implemented: the probe encodes requests and decodes
//! responses, the test harness does the opposite.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Protocol version sent in the handshake.
pub const PROTOCOL_VERSION: i32 = 47;

/// Handshake `next_state` value selecting the status flow.
pub const NEXT_STATE_STATUS: i32 = 1;

/// Packet id of the handshake, status request and status response.
pub const STATUS_PACKET_ID: i32 = 0x00;

/// Packet id of the ping and pong packets.
pub const PING_PACKET_ID: i32 = 0x01;

/// Maximum encoded length of a VarInt.
pub const MAX_VARINT_LEN: usize = 5;

/// Largest incoming packet accepted (1 MiB).
pub const MAX_PACKET_LEN: usize = 1024 * 1024;

/// Error type for codec operations
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Insufficient data to decode
    #[error("Insufficient data")]
    InsufficientData,

    /// VarInt continued past five bytes
    #[error("VarInt is longer than {MAX_VARINT_LEN} bytes")]
    VarIntTooLong,

    /// Negative or zero length prefix
    #[error("Invalid length: {0}")]
    InvalidLength(i32),

    /// Packet exceeds [`MAX_PACKET_LEN`]
    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),

    /// Packet id does not match the protocol step
    #[error("Unexpected packet id: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedPacketId { expected: i32, actual: i32 },

    /// String is not valid UTF-8
    #[error("Invalid string: {0}")]
    InvalidString(String),

    /// Underlying stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoded handshake packet body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: i32,
}

/// Append a VarInt to `buf`.
pub fn put_varint(buf: &mut impl BufMut, value: i32) {
    let mut remaining = value as u32;
    loop {
        if remaining & !0x7F == 0 {
            buf.put_u8(remaining as u8);
            return;
        }
        buf.put_u8(((remaining & 0x7F) | 0x80) as u8);
        remaining >>= 7;
    }
}

/// Read a VarInt from `buf`.
///
/// # Errors
///
/// Returns an error if the buffer ends mid-VarInt or the VarInt is too long.
pub fn get_varint(buf: &mut impl Buf) -> Result<i32, CodecError> {
    let mut value: u32 = 0;
    for group in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(CodecError::InsufficientData);
        }
        let byte = buf.get_u8();
        value |= u32::from(byte & 0x7F) << (7 * group);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(CodecError::VarIntTooLong)
}

/// Read a VarInt directly from an async stream.
///
/// # Errors
///
/// Returns `CodecError::Io` if the stream fails or closes, and
/// `CodecError::VarIntTooLong` for a sixth continuation byte.
pub async fn read_varint<R>(reader: &mut R) -> Result<i32, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut value: u32 = 0;
    for group in 0..MAX_VARINT_LEN {
        let byte = reader.read_u8().await?;
        value |= u32::from(byte & 0x7F) << (7 * group);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(CodecError::VarIntTooLong)
}

/// Append a length-prefixed UTF-8 string to `buf`.
///
/// # Errors
///
/// Returns an error if the string is longer than a VarInt can describe.
pub fn put_string(buf: &mut impl BufMut, value: &str) -> Result<(), CodecError> {
    let len = i32::try_from(value.len()).map_err(|_| CodecError::PacketTooLarge(value.len()))?;
    put_varint(buf, len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Read a length-prefixed UTF-8 string from `buf`.
///
/// # Errors
///
/// Returns an error on a negative length, truncated data or invalid UTF-8.
pub fn get_string(buf: &mut impl Buf) -> Result<String, CodecError> {
    let len = get_varint(buf)?;
    let len = usize::try_from(len).map_err(|_| CodecError::InvalidLength(len))?;
    if buf.remaining() < len {
        return Err(CodecError::InsufficientData);
    }
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::InvalidString(e.to_string()))
}

/// Frame a packet body with its id and length prefix.
pub fn frame_packet(packet_id: i32, body: &[u8]) -> Bytes {
    let mut inner = BytesMut::with_capacity(MAX_VARINT_LEN + body.len());
    put_varint(&mut inner, packet_id);
    inner.extend_from_slice(body);

    let mut framed = BytesMut::with_capacity(MAX_VARINT_LEN + inner.len());
    // inner is bounded by the caller's body, which never approaches i32::MAX here
    put_varint(&mut framed, inner.len() as i32);
    framed.extend_from_slice(&inner);
    framed.freeze()
}

/// Read one framed packet, returning its id and body.
///
/// # Errors
///
/// Returns an error if the stream fails, the length prefix is invalid or
/// larger than [`MAX_PACKET_LEN`], or the packet id cannot be decoded.
pub async fn read_packet<R>(reader: &mut R) -> Result<(i32, Bytes), CodecError>
where
    R: AsyncRead + Unpin,
{
    let len = read_varint(reader).await?;
    let len_usize = usize::try_from(len).map_err(|_| CodecError::InvalidLength(len))?;
    if len_usize == 0 {
        return Err(CodecError::InvalidLength(len));
    }
    if len_usize > MAX_PACKET_LEN {
        return Err(CodecError::PacketTooLarge(len_usize));
    }

    let mut raw = vec![0u8; len_usize];
    reader.read_exact(&mut raw).await?;

    let mut packet = Bytes::from(raw);
    let packet_id = get_varint(&mut packet)?;
    Ok((packet_id, packet))
}

fn expect_packet_id(expected: i32, actual: i32) -> Result<(), CodecError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CodecError::UnexpectedPacketId { expected, actual })
    }
}

// ============================================================================
// Client side
// ============================================================================

/// Encode the handshake that switches the connection into the status flow.
///
/// # Errors
///
/// Returns an error if the host name cannot be encoded.
pub fn encode_handshake(host: &str, port: u16) -> Result<Bytes, CodecError> {
    let mut body = BytesMut::with_capacity(host.len() + 2 * MAX_VARINT_LEN + 2);
    put_varint(&mut body, PROTOCOL_VERSION);
    put_string(&mut body, host)?;
    body.put_u16(port);
    put_varint(&mut body, NEXT_STATE_STATUS);
    Ok(frame_packet(STATUS_PACKET_ID, &body))
}

/// Encode the (empty) status request.
pub fn encode_status_request() -> Bytes {
    frame_packet(STATUS_PACKET_ID, &[])
}

/// Encode a ping carrying `payload`.
pub fn encode_ping(payload: i64) -> Bytes {
    frame_packet(PING_PACKET_ID, &payload.to_be_bytes())
}

/// Decode a status response body into its JSON document.
///
/// # Errors
///
/// Returns an error on a wrong packet id or a malformed string.
pub fn decode_status_response(packet_id: i32, mut body: Bytes) -> Result<String, CodecError> {
    expect_packet_id(STATUS_PACKET_ID, packet_id)?;
    get_string(&mut body)
}

/// Decode a pong body into its echoed payload.
///
/// # Errors
///
/// Returns an error on a wrong packet id or a short body.
pub fn decode_pong(packet_id: i32, mut body: Bytes) -> Result<i64, CodecError> {
    expect_packet_id(PING_PACKET_ID, packet_id)?;
    if body.remaining() < 8 {
        return Err(CodecError::InsufficientData);
    }
    Ok(body.get_i64())
}

// ============================================================================
// Server side
// ============================================================================

/// Decode a handshake body.
///
/// # Errors
///
/// Returns an error on a wrong packet id or a truncated body.
pub fn decode_handshake(packet_id: i32, mut body: Bytes) -> Result<Handshake, CodecError> {
    expect_packet_id(STATUS_PACKET_ID, packet_id)?;
    let protocol_version = get_varint(&mut body)?;
    let server_address = get_string(&mut body)?;
    if body.remaining() < 2 {
        return Err(CodecError::InsufficientData);
    }
    let server_port = body.get_u16();
    let next_state = get_varint(&mut body)?;
    Ok(Handshake {
        protocol_version,
        server_address,
        server_port,
        next_state,
    })
}

/// Encode a status response carrying `json`.
///
/// # Errors
///
/// Returns an error if the document cannot be encoded.
pub fn encode_status_response(json: &str) -> Result<Bytes, CodecError> {
    let mut body = BytesMut::with_capacity(json.len() + MAX_VARINT_LEN);
    put_string(&mut body, json)?;
    Ok(frame_packet(STATUS_PACKET_ID, &body))
}

/// Encode a pong echoing `payload`.
pub fn encode_pong(payload: i64) -> Bytes {
    frame_packet(PING_PACKET_ID, &payload.to_be_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn varint_bytes(value: i32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        put_varint(&mut buf, value);
        buf.to_vec()
    }

    #[test]
    fn test_varint_reference_values() {
        let cases: [(i32, &[u8]); 8] = [
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (255, &[0xff, 0x01]),
            (25565, &[0xdd, 0xc7, 0x01]),
            (2_147_483_647, &[0xff, 0xff, 0xff, 0xff, 0x07]),
            (-1, &[0xff, 0xff, 0xff, 0xff, 0x0f]),
        ];

        for (value, encoded) in cases {
            assert_eq!(varint_bytes(value), encoded, "encoding {value}");
            let mut buf = Bytes::copy_from_slice(encoded);
            assert_eq!(get_varint(&mut buf).unwrap(), value, "decoding {value}");
            assert!(!buf.has_remaining());
        }
    }

    #[test]
    fn test_varint_rejects_six_bytes() {
        let mut buf = Bytes::from_static(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(matches!(
            get_varint(&mut buf),
            Err(CodecError::VarIntTooLong)
        ));
    }

    #[test]
    fn test_varint_truncated() {
        let mut buf = Bytes::from_static(&[0x80, 0x80]);
        assert!(matches!(
            get_varint(&mut buf),
            Err(CodecError::InsufficientData)
        ));
    }

    #[test]
    fn test_string_truncated() {
        let mut buf = BytesMut::new();
        put_varint(&mut buf, 10);
        buf.put_slice(b"abc");
        let mut bytes = buf.freeze();
        assert!(matches!(
            get_string(&mut bytes),
            Err(CodecError::InsufficientData)
        ));
    }

    #[test]
    fn test_string_negative_length() {
        let mut buf = BytesMut::new();
        put_varint(&mut buf, -3);
        let mut bytes = buf.freeze();
        assert!(matches!(
            get_string(&mut bytes),
            Err(CodecError::InvalidLength(-3))
        ));
    }

    #[test]
    fn test_handshake_layout() {
        let packet = encode_handshake("mc.example.org", 25565).unwrap();

        // length, id, protocol 47, string len 14, host, port, next state
        let mut expected = vec![0x00, 47, 14];
        expected.extend_from_slice(b"mc.example.org");
        expected.extend_from_slice(&[0x63, 0xdd, 0x01]);
        let mut framed = vec![expected.len() as u8];
        framed.extend_from_slice(&expected);

        assert_eq!(packet.to_vec(), framed);
    }

    #[tokio::test]
    async fn test_server_decodes_client_handshake() {
        let packet = encode_handshake("localhost", 25570).unwrap();
        let mut reader = &packet[..];

        let (id, body) = read_packet(&mut reader).await.unwrap();
        let handshake = decode_handshake(id, body).unwrap();

        assert_eq!(
            handshake,
            Handshake {
                protocol_version: PROTOCOL_VERSION,
                server_address: "localhost".to_string(),
                server_port: 25570,
                next_state: NEXT_STATE_STATUS,
            }
        );
    }

    #[tokio::test]
    async fn test_status_response_and_pong() {
        let mut wire = encode_status_response(r#"{"players":{"online":0}}"#)
            .unwrap()
            .to_vec();
        wire.extend_from_slice(&encode_pong(0x0102_0304_0506_0708));
        let mut reader = &wire[..];

        let (id, body) = read_packet(&mut reader).await.unwrap();
        assert_eq!(
            decode_status_response(id, body).unwrap(),
            r#"{"players":{"online":0}}"#
        );

        let (id, body) = read_packet(&mut reader).await.unwrap();
        assert_eq!(decode_pong(id, body).unwrap(), 0x0102_0304_0506_0708);
    }

    #[tokio::test]
    async fn test_status_response_wrong_packet_id() {
        let wire = encode_pong(7);
        let mut reader = &wire[..];

        let (id, body) = read_packet(&mut reader).await.unwrap();
        assert!(matches!(
            decode_status_response(id, body),
            Err(CodecError::UnexpectedPacketId {
                expected: 0,
                actual: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_read_packet_rejects_oversized_length() {
        let mut wire = BytesMut::new();
        put_varint(&mut wire, (MAX_PACKET_LEN + 1) as i32);
        let wire = wire.freeze();
        let mut reader = &wire[..];

        assert!(matches!(
            read_packet(&mut reader).await,
            Err(CodecError::PacketTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_read_packet_rejects_zero_length() {
        let wire = [0x00u8];
        let mut reader = &wire[..];

        assert!(matches!(
            read_packet(&mut reader).await,
            Err(CodecError::InvalidLength(0))
        ));
    }

    #[tokio::test]
    async fn test_read_packet_eof_is_io_error() {
        let wire = [0x05u8, 0x00];
        let mut reader = &wire[..];

        assert!(matches!(
            read_packet(&mut reader).await,
            Err(CodecError::Io(_))
        ));
    }
}
